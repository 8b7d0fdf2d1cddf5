//! Critical path: the longest dependency chain by task count.

use std::collections::HashMap;

use workflow_types::plan::ExecutionPlan;

use super::graph::DependencyGraph;
use super::planner::{self, PlanError};

/// Longest chain of dependent tasks, ordered first to last.
///
/// Every task has unit weight. Ties are broken by declaration order: the
/// earliest-declared end task wins, and along the chain the earliest-declared
/// predecessor wins.
pub fn critical_path(graph: &DependencyGraph) -> Result<Vec<String>, PlanError> {
    let plan = planner::plan(graph)?;
    Ok(critical_path_for_plan(graph, &plan))
}

/// [`critical_path`] for a graph whose plan is already known.
pub fn critical_path_for_plan(graph: &DependencyGraph, plan: &ExecutionPlan) -> Vec<String> {
    let order = plan.execution_order();
    let mut longest: HashMap<&str, usize> = HashMap::new();
    let mut predecessor: HashMap<&str, &str> = HashMap::new();

    for id in order.iter().map(String::as_str) {
        let mut best: Option<(&str, usize)> = None;
        for dep in graph.dependencies(id) {
            let len = longest.get(dep).copied().unwrap_or(0);
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((dep, len));
            }
        }

        match best {
            Some((dep, len)) => {
                longest.insert(id, len + 1);
                predecessor.insert(id, dep);
            }
            None => {
                longest.insert(id, 1);
            }
        }
    }

    let mut end: Option<(&str, usize)> = None;
    for id in graph.task_ids() {
        let len = longest.get(id).copied().unwrap_or(0);
        if len > end.map_or(0, |(_, l)| l) {
            end = Some((id, len));
        }
    }

    let Some((mut current, _)) = end else {
        return Vec::new();
    };

    let mut path = vec![current.to_string()];
    while let Some(prev) = predecessor.get(current) {
        path.push(prev.to_string());
        current = prev;
    }
    path.reverse();
    path
}
