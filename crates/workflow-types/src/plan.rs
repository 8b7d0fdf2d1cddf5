//! Execution plan and dependency-graph view types.
//!
//! These are the derived structures shared by the CLI (`explain`, `test`),
//! the debug session, and the HTTP API that feeds the UI's plan and graph
//! views. They are produced by `workflow-core` and never mutated afterwards.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Execution plan
// ---------------------------------------------------------------------------

/// A set of tasks that may run concurrently once every earlier group is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionGroup {
    /// Position in topological order (0-based).
    pub group_index: usize,
    /// Task IDs in declaration order.
    pub tasks: Vec<String>,
    /// `true` exactly when the group holds more than one task.
    pub parallel: bool,
    /// Indices of earlier groups this group's tasks depend on (sorted).
    pub depends_on: Vec<usize>,
}

/// Leveled topological ordering of a workflow's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub groups: Vec<ExecutionGroup>,
    /// Largest group size.
    pub max_parallel_width: usize,
    /// Number of groups.
    pub execution_depth: usize,
}

impl ExecutionPlan {
    /// Total number of planned tasks.
    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    /// Index of the group containing `task_id`.
    pub fn group_of(&self, task_id: &str) -> Option<usize> {
        self.groups
            .iter()
            .find(|g| g.tasks.iter().any(|t| t == task_id))
            .map(|g| g.group_index)
    }

    /// Groups concatenated in order: the sequence a stepping debugger walks.
    pub fn execution_order(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| g.tasks.iter().cloned())
            .collect()
    }
}

/// Everything `explain` reports about a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAnalysis {
    pub workflow: String,
    pub namespace: String,
    pub task_count: usize,
    pub plan: ExecutionPlan,
    pub critical_path: Vec<String>,
}

// ---------------------------------------------------------------------------
// Graph view (UI visualization)
// ---------------------------------------------------------------------------

/// How a dependency edge was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Listed in `dependsOn`.
    Explicit,
    /// Inferred from a `{{tasks.<id>...}}` template reference.
    Implicit,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Explicit => f.write_str("explicit"),
            EdgeKind::Implicit => f.write_str("implicit"),
        }
    }
}

/// A node in the rendered dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    /// `None` for placeholder nodes standing in for dangling targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<String>,
    /// Execution group, when the graph is acyclic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    /// The node is referenced but not declared.
    #[serde(default)]
    pub missing: bool,
}

/// An edge in the rendered dependency graph (dependency -> dependent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    /// `from` is not a declared task.
    #[serde(default)]
    pub dangling: bool,
}

/// Serializable snapshot of a dependency graph for visualization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(index: usize, tasks: &[&str], depends_on: Vec<usize>) -> ExecutionGroup {
        ExecutionGroup {
            group_index: index,
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            parallel: tasks.len() > 1,
            depends_on,
        }
    }

    #[test]
    fn test_execution_order_concatenates_groups() {
        let plan = ExecutionPlan {
            groups: vec![group(0, &["a", "b"], vec![]), group(1, &["c"], vec![0])],
            max_parallel_width: 2,
            execution_depth: 2,
        };
        assert_eq!(plan.execution_order(), vec!["a", "b", "c"]);
        assert_eq!(plan.task_count(), 3);
        assert_eq!(plan.group_of("c"), Some(1));
        assert_eq!(plan.group_of("zzz"), None);
    }

    #[test]
    fn test_plan_serializes_camel_case() {
        let plan = ExecutionPlan {
            groups: vec![group(0, &["a"], vec![])],
            max_parallel_width: 1,
            execution_depth: 1,
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["maxParallelWidth"], 1);
        assert_eq!(json["executionDepth"], 1);
        assert_eq!(json["groups"][0]["groupIndex"], 0);
        assert_eq!(json["groups"][0]["parallel"], false);
        assert!(json["groups"][0]["dependsOn"].as_array().unwrap().is_empty());
    }
}
