//! Execution planner: leveled topological grouping.
//!
//! Group 0 holds every task with no dependencies; group `k` holds every
//! remaining task whose dependencies all sit in groups `< k`. Within a group
//! tasks keep their declaration order, so the plan is a pure function of
//! the definition.

use std::collections::HashMap;

use thiserror::Error;
use workflow_types::plan::{ExecutionGroup, ExecutionPlan};
use workflow_types::workflow::WorkflowDefinition;

use super::graph::{self, DependencyGraph};

/// Errors from planning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },
}

/// Compute the execution plan for a dependency graph.
///
/// Fails with [`PlanError::CycleDetected`] instead of looping when the graph
/// is cyclic. Dangling dependencies are ignored here; the graph only holds
/// edges between declared tasks.
pub fn plan(graph: &DependencyGraph) -> Result<ExecutionPlan, PlanError> {
    if let Some(cycle) = graph.find_cycle() {
        return Err(PlanError::CycleDetected { cycle });
    }

    let mut group_of: HashMap<&str, usize> = HashMap::new();
    let mut remaining: Vec<&str> = graph.task_ids();
    let mut groups: Vec<ExecutionGroup> = Vec::new();

    // Each round places at least one task, so `len` rounds always suffice.
    for group_index in 0..graph.len() {
        if remaining.is_empty() {
            break;
        }

        let (ready, blocked): (Vec<&str>, Vec<&str>) = remaining.into_iter().partition(|id| {
            graph
                .dependencies(id)
                .iter()
                .all(|dep| group_of.contains_key(dep))
        });

        if ready.is_empty() {
            return Err(PlanError::CycleDetected {
                cycle: blocked.iter().map(|s| s.to_string()).collect(),
            });
        }

        let mut depends_on: Vec<usize> = ready
            .iter()
            .flat_map(|id| graph.dependencies(id))
            .filter_map(|dep| group_of.get(dep).copied())
            .collect();
        depends_on.sort_unstable();
        depends_on.dedup();

        for id in &ready {
            group_of.insert(*id, group_index);
        }

        groups.push(ExecutionGroup {
            group_index,
            parallel: ready.len() > 1,
            tasks: ready.into_iter().map(str::to_string).collect(),
            depends_on,
        });
        remaining = blocked;
    }

    let max_parallel_width = groups.iter().map(|g| g.tasks.len()).max().unwrap_or(0);

    tracing::debug!(
        groups = groups.len(),
        max_parallel_width,
        "computed execution plan"
    );

    Ok(ExecutionPlan {
        execution_depth: groups.len(),
        max_parallel_width,
        groups,
    })
}

/// Build the graph for a workflow and plan it in one go.
pub fn plan_workflow(workflow: &WorkflowDefinition) -> Result<ExecutionPlan, PlanError> {
    plan(&graph::build(workflow, None).graph)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashSet};
    use workflow_types::workflow::TaskNode;

    fn workflow(tasks: Vec<TaskNode>) -> WorkflowDefinition {
        WorkflowDefinition {
            name: "test".to_string(),
            namespace: "default".to_string(),
            description: None,
            input: None,
            tasks,
            output: BTreeMap::new(),
        }
    }

    fn group_tasks(plan: &ExecutionPlan) -> Vec<Vec<&str>> {
        plan.groups
            .iter()
            .map(|g| g.tasks.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_diamond_with_side_branch() {
        let wf = workflow(vec![
            TaskNode::new("fetch-user", "get-user", &[]),
            TaskNode::new("fetch-inventory", "get-inventory", &[]),
            TaskNode::new("check-credit", "credit", &["fetch-user"]),
            TaskNode::new("process-order", "order", &["fetch-user", "fetch-inventory"]),
            TaskNode::new("send-email", "email", &["process-order", "check-credit"]),
        ]);
        let plan = plan_workflow(&wf).unwrap();

        assert_eq!(
            group_tasks(&plan),
            vec![
                vec!["fetch-user", "fetch-inventory"],
                vec!["check-credit", "process-order"],
                vec!["send-email"],
            ]
        );
        assert!(plan.groups[0].parallel);
        assert!(plan.groups[1].parallel);
        assert!(!plan.groups[2].parallel);
        assert_eq!(plan.groups[1].depends_on, vec![0]);
        assert_eq!(plan.groups[2].depends_on, vec![1]);
        assert_eq!(plan.max_parallel_width, 2);
        assert_eq!(plan.execution_depth, 3);
    }

    #[test]
    fn test_group_depends_on_every_upstream_group() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &[]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("c", "t", &["a", "b"]),
        ]);
        let plan = plan_workflow(&wf).unwrap();

        assert_eq!(group_tasks(&plan), vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert_eq!(plan.groups[0].depends_on, Vec::<usize>::new());
        assert_eq!(plan.groups[1].depends_on, vec![0]);
        assert_eq!(plan.groups[2].depends_on, vec![0, 1]);
    }

    #[test]
    fn test_group_depends_on_skips_unrelated_levels() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &[]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("c", "t", &["b"]),
            TaskNode::new("d", "t", &["c"]),
            TaskNode::new("e", "t", &["a", "c"]),
        ]);
        let plan = plan_workflow(&wf).unwrap();

        assert_eq!(
            group_tasks(&plan),
            vec![vec!["a"], vec!["b"], vec!["c"], vec!["d", "e"]]
        );
        // Nothing in group 3 reads from group 1.
        assert_eq!(plan.groups[3].depends_on, vec![0, 2]);
    }

    #[test]
    fn test_sequential_chain() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &[]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("c", "t", &["b"]),
        ]);
        let plan = plan_workflow(&wf).unwrap();
        assert_eq!(group_tasks(&plan), vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert_eq!(plan.max_parallel_width, 1);
        assert!(plan.groups.iter().all(|g| !g.parallel));
    }

    #[test]
    fn test_implicit_dependency_orders_groups() {
        let wf = workflow(vec![
            TaskNode::new("report", "t", &[]).with_input("data", json!("{{tasks.load.output}}")),
            TaskNode::new("load", "t", &[]),
        ]);
        let plan = plan_workflow(&wf).unwrap();
        assert_eq!(group_tasks(&plan), vec![vec!["load"], vec!["report"]]);
    }

    #[test]
    fn test_empty_workflow_has_empty_plan() {
        let plan = plan_workflow(&workflow(vec![])).unwrap();
        assert!(plan.groups.is_empty());
        assert_eq!(plan.max_parallel_width, 0);
        assert_eq!(plan.execution_depth, 0);
    }

    #[test]
    fn test_cycle_fails_instead_of_looping() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &["c"]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("c", "t", &["b"]),
        ]);
        let err = plan_workflow(&wf).unwrap_err();
        let PlanError::CycleDetected { cycle } = err;
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&"b".to_string()));
    }

    #[test]
    fn test_plan_partitions_tasks_and_respects_dependencies() {
        let wf = workflow(vec![
            TaskNode::new("a", "t", &[]),
            TaskNode::new("b", "t", &["a"]),
            TaskNode::new("c", "t", &[]),
            TaskNode::new("d", "t", &["b", "c"]),
            TaskNode::new("e", "t", &["a"]).with_input("x", json!("{{tasks.d.status}}")),
            TaskNode::new("f", "t", &[]),
        ]);
        let built = graph::build(&wf, None);
        let plan = plan(&built.graph).unwrap();

        let mut seen = HashSet::new();
        for group in &plan.groups {
            for task in &group.tasks {
                assert!(seen.insert(task.clone()), "{task} planned twice");
                for dep in built.graph.dependencies(task) {
                    assert!(plan.group_of(dep).unwrap() < group.group_index);
                }
            }
        }
        assert_eq!(seen.len(), built.graph.len());
    }

    #[test]
    fn test_plan_is_deterministic() {
        let wf = workflow(vec![
            TaskNode::new("x", "t", &[]),
            TaskNode::new("y", "t", &["x"]),
            TaskNode::new("z", "t", &["x"]),
        ]);
        assert_eq!(plan_workflow(&wf).unwrap(), plan_workflow(&wf).unwrap());
    }
}
