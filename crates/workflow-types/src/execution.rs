//! Workflow run results and dry-run response shapes.
//!
//! The same shapes are produced by the local mock runner and returned by the
//! remote Gateway, so the CLI renders both identically.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::debug::TaskStatus;
use crate::plan::ExecutionPlan;

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Result of one task within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: String,
    pub task_ref: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Result of executing a whole workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunResult {
    pub execution_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub task_results: Vec<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowRunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// One group in a dry-run plan: the minimal `{tasks, parallel}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunGroup {
    pub tasks: Vec<String>,
    pub parallel: bool,
}

/// Plan shape shared by the local planner and the Gateway dry-run endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunPlan {
    pub groups: Vec<DryRunGroup>,
}

impl From<&ExecutionPlan> for DryRunPlan {
    fn from(plan: &ExecutionPlan) -> Self {
        Self {
            groups: plan
                .groups
                .iter()
                .map(|g| DryRunGroup {
                    tasks: g.tasks.clone(),
                    parallel: g.parallel,
                })
                .collect(),
        }
    }
}

/// Response of a dry run (local or remote).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResponse {
    pub valid: bool,
    #[serde(default)]
    pub execution_plan: DryRunPlan,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
