//! Execution context and debug session types.
//!
//! `ExecutionContext` is the template-resolution context shared by dry runs,
//! local runs and the debugger. The remaining types describe a debug
//! session as seen by callers: sessions are only ever handed out as
//! `SessionSnapshot` values, never as the live mutable object.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Task status and execution context
// ---------------------------------------------------------------------------

/// Outcome of a single task execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Recorded state of one task inside an execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskState {
    pub fn success(output: Value) -> Self {
        Self {
            status: TaskStatus::Success,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// `{input, tasks: {<id>: {status, output|error}}}` -- the object templates
/// resolve against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub input: Value,
    pub tasks: BTreeMap<String, TaskState>,
}

impl ExecutionContext {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            tasks: BTreeMap::new(),
        }
    }

    /// Build the JSON object used for template resolution.
    pub fn to_template_context(&self) -> Value {
        let tasks: serde_json::Map<String, Value> = self
            .tasks
            .iter()
            .map(|(id, state)| {
                let mut entry = json!({ "status": state.status });
                if let Some(output) = &state.output {
                    entry["output"] = output.clone();
                }
                if let Some(error) = &state.error {
                    entry["error"] = json!(error);
                }
                (id.clone(), entry)
            })
            .collect();

        json!({
            "input": self.input,
            "tasks": tasks,
        })
    }
}

// ---------------------------------------------------------------------------
// Debug session
// ---------------------------------------------------------------------------

/// Lifecycle state of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Ready,
    Running,
    Paused,
    Completed,
    Stopped,
    Failed,
}

impl SessionState {
    /// Terminal states accept no further execution.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Stopped | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Ready => "ready",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A breakpoint on a task ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub enabled: bool,
    pub hit_count: u32,
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self {
            enabled: true,
            hit_count: 0,
        }
    }
}

/// One executed task, appended to the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub task_id: String,
    pub task_ref: String,
    pub status: TaskStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Immutable view of a debug session at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub workflow: String,
    pub state: SessionState,
    pub context: ExecutionContext,
    pub execution_order: Vec<String>,
    pub current_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub breakpoints: BTreeMap<String, Breakpoint>,
    /// Task refs that currently have a canned response registered.
    pub mocked_task_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_context_shape() {
        let mut ctx = ExecutionContext::new(json!({ "userId": "u1" }));
        ctx.tasks
            .insert("fetch-user".to_string(), TaskState::success(json!({ "name": "Ada" })));
        ctx.tasks
            .insert("charge".to_string(), TaskState::failed("card declined"));

        let value = ctx.to_template_context();
        assert_eq!(value["input"]["userId"], "u1");
        assert_eq!(value["tasks"]["fetch-user"]["status"], "success");
        assert_eq!(value["tasks"]["fetch-user"]["output"]["name"], "Ada");
        assert_eq!(value["tasks"]["charge"]["status"], "failed");
        assert_eq!(value["tasks"]["charge"]["error"], "card declined");
        assert!(value["tasks"]["charge"].get("output").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Ready.is_terminal());
        assert!(!SessionState::Paused.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Stopped.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert_eq!(SessionState::Paused.to_string(), "paused");
    }

    #[test]
    fn test_breakpoint_default_enabled() {
        let bp = Breakpoint::default();
        assert!(bp.enabled);
        assert_eq!(bp.hit_count, 0);
    }
}
