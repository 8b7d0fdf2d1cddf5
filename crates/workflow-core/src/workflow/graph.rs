//! Dependency graph builder and cycle detection.
//!
//! Models task dependencies as a `petgraph` directed graph with edges from
//! dependency to dependent. Edges come from explicit `dependsOn` entries and
//! from implicit `{{tasks.<id>...}}` references in task input. Building
//! never fails: duplicate IDs, dangling references and cycles are collected
//! as [`ValidationIssue`]s next to a best-effort graph.
//!
//! Node indices follow declaration order, and every query returns IDs in
//! that order so output is deterministic.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use workflow_types::error::ValidationIssue;
use workflow_types::plan::{EdgeKind, ExecutionPlan, GraphEdge, GraphNode, GraphView};
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use super::template::{self, TemplatePath};

// ---------------------------------------------------------------------------
// Graph types
// ---------------------------------------------------------------------------

/// Node weight: a declared task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskVertex {
    pub id: String,
    pub task_ref: String,
}

impl fmt::Display for TaskVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A dependency pointing at an undeclared task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingEdge {
    /// The declared task that has the dependency.
    pub task_id: String,
    /// The undeclared task it depends on.
    pub missing: String,
    pub kind: EdgeKind,
}

/// Directed task dependency graph (dependency -> dependent).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<TaskVertex, EdgeKind>,
    index: HashMap<String, NodeIndex>,
    dangling: Vec<DanglingEdge>,
}

/// Output of [`build`]: the graph plus every issue found on the way.
#[derive(Debug, Clone)]
pub struct GraphBuild {
    pub graph: DependencyGraph,
    pub issues: Vec<ValidationIssue>,
}

impl GraphBuild {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Build the dependency graph for a workflow.
///
/// When `task_defs` is supplied, every `taskRef` must name one of them.
/// Duplicate task IDs are reported once per extra occurrence; the first
/// occurrence owns the node and later occurrences merge their edges into it.
/// An explicit edge wins over an implicit one between the same pair.
pub fn build(workflow: &WorkflowDefinition, task_defs: Option<&[TaskDefinition]>) -> GraphBuild {
    let mut graph = DependencyGraph::default();
    let mut issues = Vec::new();

    for task in &workflow.tasks {
        if graph.index.contains_key(&task.id) {
            issues.push(ValidationIssue::DuplicateTaskId {
                task_id: task.id.clone(),
            });
            continue;
        }
        let idx = graph.graph.add_node(TaskVertex {
            id: task.id.clone(),
            task_ref: task.task_ref.clone(),
        });
        graph.index.insert(task.id.clone(), idx);
    }

    let mut reported: HashSet<(String, String)> = HashSet::new();

    for task in &workflow.tasks {
        let target = graph.index[&task.id];

        for dep in &task.depends_on {
            if !graph.connect(dep, target, EdgeKind::Explicit)
                && reported.insert((task.id.clone(), dep.clone()))
            {
                issues.push(ValidationIssue::MissingDependency {
                    task_id: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        for raw in template::extract_references_in(task.input.values()) {
            let Ok(path) = TemplatePath::parse(&raw) else {
                continue;
            };
            let Some(dep) = path.task_id() else {
                continue;
            };
            if task.depends_on.iter().any(|d| d == dep) {
                continue;
            }
            if !graph.connect(dep, target, EdgeKind::Implicit)
                && reported.insert((task.id.clone(), dep.to_string()))
            {
                issues.push(ValidationIssue::InvalidTemplateExpression {
                    location: format!("task '{}' input", task.id),
                    expression: raw.clone(),
                    reason: format!("unknown task '{dep}'"),
                });
            }
        }
    }

    if let Some(defs) = task_defs {
        let known: HashSet<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        for task in &workflow.tasks {
            if !known.contains(task.task_ref.as_str()) {
                issues.push(ValidationIssue::MissingTaskReference {
                    task_id: task.id.clone(),
                    task_ref: task.task_ref.clone(),
                });
            }
        }
    }

    for (key, value) in &workflow.output {
        for task_id in template::referenced_task_ids([value]) {
            if !graph.contains(&task_id) {
                issues.push(ValidationIssue::DanglingOutputReference {
                    output_key: key.clone(),
                    task_id,
                });
            }
        }
    }

    if let Some(cycle) = graph.find_cycle() {
        issues.push(ValidationIssue::CircularDependency { cycle });
    }

    tracing::debug!(
        workflow = %workflow.name,
        nodes = graph.len(),
        edges = graph.graph.edge_count(),
        issues = issues.len(),
        "built dependency graph"
    );

    GraphBuild { graph, issues }
}

impl DependencyGraph {
    /// Add `dep -> target`. Returns `false` (and records a dangling edge)
    /// when `dep` is not a declared task.
    fn connect(&mut self, dep: &str, target: NodeIndex, kind: EdgeKind) -> bool {
        let Some(&from) = self.index.get(dep) else {
            let task_id = self.graph[target].id.clone();
            if !self
                .dangling
                .iter()
                .any(|d| d.task_id == task_id && d.missing == dep)
            {
                self.dangling.push(DanglingEdge {
                    task_id,
                    missing: dep.to_string(),
                    kind,
                });
            }
            return false;
        };

        match self.graph.find_edge(from, target) {
            Some(edge) => {
                if kind == EdgeKind::Explicit {
                    self.graph[edge] = EdgeKind::Explicit;
                }
            }
            None => {
                self.graph.add_edge(from, target, kind);
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl DependencyGraph {
    /// Number of distinct declared tasks.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    /// Distinct task IDs in declaration order.
    pub fn task_ids(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].id.as_str())
            .collect()
    }

    pub fn task_ref(&self, task_id: &str) -> Option<&str> {
        self.index
            .get(task_id)
            .map(|idx| self.graph[*idx].task_ref.as_str())
    }

    /// Direct dependencies of a task, in declaration order.
    pub fn dependencies(&self, task_id: &str) -> Vec<&str> {
        self.neighbors(task_id, Direction::Incoming)
    }

    /// Direct dependents of a task, in declaration order.
    pub fn dependents(&self, task_id: &str) -> Vec<&str> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    /// Tasks with no dependencies.
    pub fn roots(&self) -> Vec<&str> {
        self.filter_nodes(Direction::Incoming)
    }

    /// Tasks nothing depends on.
    pub fn leaves(&self) -> Vec<&str> {
        self.filter_nodes(Direction::Outgoing)
    }

    /// All tasks `task_id` transitively depends on, in declaration order.
    pub fn transitive_dependencies(&self, task_id: &str) -> Vec<&str> {
        let Some(&start) = self.index.get(task_id) else {
            return Vec::new();
        };

        let mut seen: BTreeSet<NodeIndex> = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for dep in self.graph.neighbors_directed(node, Direction::Incoming) {
                if dep != start && seen.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }

        seen.into_iter()
            .map(|idx| self.graph[idx].id.as_str())
            .collect()
    }

    /// Edges as `(from, to, kind)`, ordered by dependent then dependency.
    pub fn edges(&self) -> Vec<(&str, &str, EdgeKind)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (e.target(), e.source(), *e.weight()))
            .collect();
        edges.sort_by_key(|(to, from, _)| (*to, *from));
        edges
            .into_iter()
            .map(|(to, from, kind)| {
                (
                    self.graph[from].id.as_str(),
                    self.graph[to].id.as_str(),
                    kind,
                )
            })
            .collect()
    }

    /// Dependencies that point at undeclared tasks.
    pub fn dangling_edges(&self) -> &[DanglingEdge] {
        &self.dangling
    }

    fn neighbors(&self, task_id: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(task_id) else {
            return Vec::new();
        };
        self.sorted_neighbors(idx, direction)
            .into_iter()
            .map(|n| self.graph[n].id.as_str())
            .collect()
    }

    fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        // petgraph yields neighbors newest-edge first.
        let mut nodes: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    fn filter_nodes(&self, empty_direction: Direction) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, empty_direction)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].id.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

impl DependencyGraph {
    /// Find one dependency cycle, if any.
    ///
    /// Depth-first search with an explicit stack, visiting roots and
    /// successors in declaration order. The returned path starts and ends
    /// with the same task ID (`[a, b, c, a]`); a self-dependency yields
    /// `[a, a]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::White; self.graph.node_count()];

        for start in self.graph.node_indices() {
            if marks[start.index()] != Mark::White {
                continue;
            }

            marks[start.index()] = Mark::Gray;
            let mut stack = vec![(start, self.sorted_neighbors(start, Direction::Outgoing), 0usize)];

            loop {
                let Some(top) = stack.last_mut() else {
                    break;
                };
                let node = top.0;
                let next = top.1.get(top.2).copied();
                top.2 += 1;

                let Some(next) = next else {
                    marks[node.index()] = Mark::Black;
                    stack.pop();
                    continue;
                };

                match marks[next.index()] {
                    Mark::White => {
                        marks[next.index()] = Mark::Gray;
                        let successors = self.sorted_neighbors(next, Direction::Outgoing);
                        stack.push((next, successors, 0));
                    }
                    Mark::Gray => {
                        let from = stack
                            .iter()
                            .position(|(n, _, _)| *n == next)
                            .unwrap_or(0);
                        let mut cycle: Vec<String> = stack[from..]
                            .iter()
                            .map(|(n, _, _)| self.graph[*n].id.clone())
                            .collect();
                        cycle.push(self.graph[next].id.clone());
                        return Some(cycle);
                    }
                    Mark::Black => {}
                }
            }
        }

        None
    }

    pub fn is_acyclic(&self) -> bool {
        self.find_cycle().is_none()
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

impl DependencyGraph {
    /// Serializable view for the UI. Groups are filled in from `plan` when
    /// given; undeclared dependency targets appear as `missing` nodes.
    pub fn view(&self, plan: Option<&ExecutionPlan>) -> GraphView {
        let mut nodes: Vec<GraphNode> = self
            .graph
            .node_indices()
            .map(|idx| {
                let vertex = &self.graph[idx];
                GraphNode {
                    id: vertex.id.clone(),
                    task_ref: Some(vertex.task_ref.clone()),
                    group: plan.and_then(|p| p.group_of(&vertex.id)),
                    missing: false,
                }
            })
            .collect();

        let mut edges: Vec<GraphEdge> = self
            .edges()
            .into_iter()
            .map(|(from, to, kind)| GraphEdge {
                from: from.to_string(),
                to: to.to_string(),
                kind,
                dangling: false,
            })
            .collect();

        for dangling in &self.dangling {
            if !nodes.iter().any(|n| n.id == dangling.missing) {
                nodes.push(GraphNode {
                    id: dangling.missing.clone(),
                    task_ref: None,
                    group: None,
                    missing: true,
                });
            }
            edges.push(GraphEdge {
                from: dangling.missing.clone(),
                to: dangling.task_id.clone(),
                kind: dangling.kind,
                dangling: true,
            });
        }

        GraphView { nodes, edges }
    }

    /// Graphviz DOT rendering. Implicit edges are dashed.
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::EdgeNoLabel],
            &|_, edge| match edge.weight() {
                EdgeKind::Implicit => "style = dashed".to_string(),
                EdgeKind::Explicit => String::new(),
            },
            &|_, _| String::new(),
        );
        format!("{dot}")
    }

    /// Mermaid flowchart rendering. Implicit edges are dotted.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        for idx in self.graph.node_indices() {
            out.push_str(&format!(
                "    n{}[\"{}\"]\n",
                idx.index(),
                self.graph[idx].id.replace('"', "'")
            ));
        }

        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (e.target(), e.source(), *e.weight()))
            .collect();
        edges.sort_by_key(|(to, from, _)| (*to, *from));
        for (to, from, kind) in edges {
            let arrow = match kind {
                EdgeKind::Explicit => "-->",
                EdgeKind::Implicit => "-.->",
            };
            out.push_str(&format!("    n{} {arrow} n{}\n", from.index(), to.index()));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
