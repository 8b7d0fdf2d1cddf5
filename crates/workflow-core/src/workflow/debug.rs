//! Debug session state machine.
//!
//! A `DebugSession` walks the planner's flattened execution order one task
//! at a time. Transitions:
//!
//! ```text
//! ready --start--> running --(breakpoint)--> paused
//! paused --step--> paused | completed      paused --continue--> running
//! running --(order exhausted)--> completed  any task failure --> failed
//! ready | running | paused --stop--> stopped
//! ```
//!
//! Every operation returns a [`SessionSnapshot`]; calling one in a state
//! that does not allow it returns [`SessionError::InvalidState`] and
//! leaves the session untouched.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;
use workflow_types::debug::{
    Breakpoint, ExecutionContext, HistoryEntry, SessionSnapshot, SessionState, TaskState,
    TaskStatus,
};
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use super::executor::{BoxTaskExecutor, TaskInvocation};
use super::graph;
use super::planner::{self, PlanError};
use super::template::{self, INPUT_ROOT, TASKS_ROOT, TemplatePath};

/// Errors from debug session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {operation} a session in state '{state}'")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("invalid context path '{0}'")]
    InvalidContextPath(String),

    #[error("no breakpoint on task '{0}'")]
    UnknownBreakpoint(String),

    #[error("debug session {0} not found")]
    NotFound(Uuid),
}

/// A steppable, mutable execution of one workflow.
#[derive(Debug)]
pub struct DebugSession {
    id: Uuid,
    state: SessionState,
    workflow: Arc<WorkflowDefinition>,
    tasks: Arc<Vec<TaskDefinition>>,
    context: ExecutionContext,
    execution_order: Vec<String>,
    current_index: usize,
    history: Vec<HistoryEntry>,
    breakpoints: BTreeMap<String, Breakpoint>,
    mock_responses: BTreeMap<String, Value>,
    executor: Arc<BoxTaskExecutor>,
    error: Option<String>,
}

impl DebugSession {
    /// Plan the workflow and create a session in `ready` state.
    ///
    /// Fails only when the workflow is cyclic.
    pub fn create(
        workflow: WorkflowDefinition,
        tasks: Vec<TaskDefinition>,
        input: Value,
        executor: Arc<BoxTaskExecutor>,
    ) -> Result<Self, SessionError> {
        let built = graph::build(&workflow, None);
        let plan = planner::plan(&built.graph)?;
        let id = Uuid::now_v7();

        tracing::info!(
            session_id = %id,
            workflow = %workflow.name,
            tasks = plan.task_count(),
            "debug session created"
        );

        Ok(Self {
            id,
            state: SessionState::Ready,
            workflow: Arc::new(workflow),
            tasks: Arc::new(tasks),
            context: ExecutionContext::new(input),
            execution_order: plan.execution_order(),
            current_index: 0,
            history: Vec::new(),
            breakpoints: BTreeMap::new(),
            mock_responses: BTreeMap::new(),
            executor,
            error: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    /// The next task to run, if the session can still run one.
    pub fn current_task(&self) -> Option<&str> {
        if self.state.is_terminal() {
            return None;
        }
        self.execution_order.get(self.current_index).map(String::as_str)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            workflow: self.workflow.name.clone(),
            state: self.state,
            context: self.context.clone(),
            execution_order: self.execution_order.clone(),
            current_index: self.current_index,
            current_task: self.current_task().map(str::to_string),
            history: self.history.clone(),
            breakpoints: self.breakpoints.clone(),
            mocked_task_refs: self.mock_responses.keys().cloned().collect(),
            error: self.error.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Execution control
    // -----------------------------------------------------------------------

    /// Run from the beginning until a breakpoint, a failure, or the end.
    pub async fn start(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.require("start", &[SessionState::Ready])?;
        self.run_until_pause(false).await;
        Ok(self.snapshot())
    }

    /// Execute exactly one task, then pause (or complete).
    pub async fn step(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.require("step", &[SessionState::Ready, SessionState::Paused])?;

        if self.current_index >= self.execution_order.len() {
            self.state = SessionState::Completed;
            return Ok(self.snapshot());
        }

        self.state = SessionState::Running;
        if !self.execute_current().await {
            self.state = SessionState::Failed;
            return Ok(self.snapshot());
        }

        match self.execution_order.get(self.current_index).cloned() {
            None => self.state = SessionState::Completed,
            Some(next) => {
                self.hit_breakpoint(&next);
                self.state = SessionState::Paused;
            }
        }
        Ok(self.snapshot())
    }

    /// Resume from a pause; the breakpoint on the current task does not
    /// re-trigger.
    pub async fn continue_run(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.require("continue", &[SessionState::Paused])?;
        self.run_until_pause(true).await;
        Ok(self.snapshot())
    }

    /// Stop the session. Context and history are kept as they are.
    pub fn stop(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.require(
            "stop",
            &[SessionState::Ready, SessionState::Running, SessionState::Paused],
        )?;
        self.state = SessionState::Stopped;
        tracing::info!(session_id = %self.id, "debug session stopped");
        Ok(self.snapshot())
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Bounded run loop: at most one iteration per remaining task plus one
    /// to observe exhaustion.
    async fn run_until_pause(&mut self, skip_first_breakpoint: bool) {
        self.state = SessionState::Running;
        let mut skip = skip_first_breakpoint;

        for _ in 0..=self.execution_order.len() {
            let Some(task_id) = self.execution_order.get(self.current_index).cloned() else {
                self.state = SessionState::Completed;
                return;
            };

            if !skip && self.hit_breakpoint(&task_id) {
                self.state = SessionState::Paused;
                tracing::debug!(session_id = %self.id, %task_id, "paused at breakpoint");
                return;
            }
            skip = false;

            if !self.execute_current().await {
                self.state = SessionState::Failed;
                return;
            }
        }

        self.state = if self.current_index >= self.execution_order.len() {
            SessionState::Completed
        } else {
            SessionState::Paused
        };
    }

    /// Count a hit if an enabled breakpoint sits on `task_id`.
    fn hit_breakpoint(&mut self, task_id: &str) -> bool {
        match self.breakpoints.get_mut(task_id) {
            Some(bp) if bp.enabled => {
                bp.hit_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Execute the task at `current_index`, record it, and advance.
    /// Returns `false` when the task failed.
    async fn execute_current(&mut self) -> bool {
        let Some(task_id) = self.execution_order.get(self.current_index).cloned() else {
            return true;
        };
        let Some(node) = self.workflow.task(&task_id).cloned() else {
            self.current_index += 1;
            return true;
        };

        let input_value = Value::Object(node.input.into_iter().collect());
        let resolved = template::resolve_value(&input_value, &self.context.to_template_context());
        if !resolved.is_complete() {
            tracing::debug!(
                session_id = %self.id,
                %task_id,
                unresolved = ?resolved.unresolved,
                "task input has unresolved references"
            );
        }

        let timestamp = Utc::now();
        let started = Instant::now();
        let result = match self.mock_responses.get(&node.task_ref) {
            Some(mock) => Ok(mock.clone()),
            None => {
                let invocation = TaskInvocation {
                    workflow: self.workflow.name.clone(),
                    namespace: self.workflow.namespace.clone(),
                    task_id: task_id.clone(),
                    task_ref: node.task_ref.clone(),
                    input: resolved.value,
                    definition: self.tasks.iter().find(|d| d.name == node.task_ref).cloned(),
                };
                self.executor.execute(&invocation).await
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let status = match result {
            Ok(output) => {
                self.context.tasks.insert(task_id.clone(), TaskState::success(output));
                TaskStatus::Success
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(session_id = %self.id, %task_id, error = %message, "task failed");
                self.context
                    .tasks
                    .insert(task_id.clone(), TaskState::failed(message.clone()));
                self.error = Some(message);
                TaskStatus::Failed
            }
        };

        self.history.push(HistoryEntry {
            task_id,
            task_ref: node.task_ref,
            status,
            duration_ms,
            timestamp,
        });
        self.current_index += 1;

        status == TaskStatus::Success
    }

    // -----------------------------------------------------------------------
    // Breakpoints, mocks, and context mutation
    // -----------------------------------------------------------------------

    /// Add a breakpoint; re-adding resets it to enabled with no hits.
    /// Unknown task IDs are accepted and simply never hit.
    pub fn add_breakpoint(&mut self, task_id: &str) -> SessionSnapshot {
        self.breakpoints
            .insert(task_id.to_string(), Breakpoint::default());
        self.snapshot()
    }

    pub fn remove_breakpoint(&mut self, task_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.breakpoints
            .remove(task_id)
            .ok_or_else(|| SessionError::UnknownBreakpoint(task_id.to_string()))?;
        Ok(self.snapshot())
    }

    pub fn set_breakpoint_enabled(
        &mut self,
        task_id: &str,
        enabled: bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let bp = self
            .breakpoints
            .get_mut(task_id)
            .ok_or_else(|| SessionError::UnknownBreakpoint(task_id.to_string()))?;
        bp.enabled = enabled;
        Ok(self.snapshot())
    }

    /// Use `response` as the output of every task with this `taskRef`.
    pub fn set_mock_response(&mut self, task_ref: &str, response: Value) -> SessionSnapshot {
        self.mock_responses.insert(task_ref.to_string(), response);
        self.snapshot()
    }

    pub fn clear_mock_response(&mut self, task_ref: &str) -> SessionSnapshot {
        self.mock_responses.remove(task_ref);
        self.snapshot()
    }

    /// Overwrite a value in the execution context for what-if exploration.
    ///
    /// Accepted paths: `input`, `input.<path>`, `tasks.<id>`,
    /// `tasks.<id>.output[.<path>]`, `tasks.<id>.status`, `tasks.<id>.error`.
    pub fn set_context_value(
        &mut self,
        path: &str,
        value: Value,
    ) -> Result<SessionSnapshot, SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidState {
                operation: "modify context of",
                state: self.state,
            });
        }

        let invalid = || SessionError::InvalidContextPath(path.to_string());
        let parsed = TemplatePath::parse(path).map_err(|_| invalid())?;
        let segments = parsed.segments();

        match parsed.root() {
            INPUT_ROOT => {
                if !template::assign(&mut self.context.input, &segments[1..], value) {
                    return Err(invalid());
                }
            }
            TASKS_ROOT => {
                let task_id = segments.get(1).ok_or_else(invalid)?;
                match segments.get(2).map(String::as_str) {
                    None => {
                        let state: TaskState =
                            serde_json::from_value(value).map_err(|_| invalid())?;
                        self.context.tasks.insert(task_id.clone(), state);
                    }
                    Some("output") => {
                        let entry = self
                            .context
                            .tasks
                            .entry(task_id.clone())
                            .or_insert_with(|| TaskState::success(Value::Null));
                        let output = entry.output.get_or_insert(Value::Null);
                        if !template::assign(output, &segments[3..], value) {
                            return Err(invalid());
                        }
                    }
                    Some("status") if segments.len() == 3 => {
                        let status: TaskStatus =
                            serde_json::from_value(value).map_err(|_| invalid())?;
                        self.task_entry(task_id).status = status;
                    }
                    Some("error") if segments.len() == 3 => {
                        let message = value.as_str().ok_or_else(invalid)?.to_string();
                        self.task_entry(task_id).error = Some(message);
                    }
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(invalid()),
        }

        tracing::debug!(session_id = %self.id, %path, "context value set");
        Ok(self.snapshot())
    }

    fn task_entry(&mut self, task_id: &str) -> &mut TaskState {
        self.context
            .tasks
            .entry(task_id.to_string())
            .or_insert(TaskState {
                status: TaskStatus::Pending,
                output: None,
                error: None,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::executor::MockExecutor;
    use serde_json::json;
    use workflow_types::workflow::TaskNode;

    fn user_workflow() -> WorkflowDefinition {
        WorkflowDefinition {
            name: "user-orders".to_string(),
            namespace: "default".to_string(),
            description: None,
            input: None,
            tasks: vec![
                TaskNode::new("fetch-user", "get-user", &[])
                    .with_input("id", json!("{{input.userId}}")),
                TaskNode::new("fetch-orders", "get-orders", &["fetch-user"])
                    .with_input("user", json!("{{tasks.fetch-user.output.name}}")),
            ],
            output: BTreeMap::new(),
        }
    }

    fn session_with(executor: MockExecutor) -> DebugSession {
        DebugSession::create(
            user_workflow(),
            Vec::new(),
            json!({ "userId": "u-1" }),
            Arc::new(BoxTaskExecutor::new(executor)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_breakpoint_then_step() {
        let mut wf = user_workflow();
        wf.tasks.push(
            TaskNode::new("process", "process-orders", &["fetch-orders"])
                .with_input("orders", json!("{{tasks.fetch-orders.output}}")),
        );
        let mut session = DebugSession::create(
            wf,
            Vec::new(),
            json!({ "userId": "u-1" }),
            Arc::new(BoxTaskExecutor::new(
                MockExecutor::new().with_response("get-user", json!({ "name": "Ada" })),
            )),
        )
        .unwrap();
        session.add_breakpoint("fetch-user");
        assert_eq!(
            session.snapshot().execution_order,
            vec!["fetch-user", "fetch-orders", "process"]
        );

        let snap = session.start().await.unwrap();
        assert_eq!(snap.state, SessionState::Paused);
        assert_eq!(snap.current_index, 0);
        assert_eq!(snap.current_task.as_deref(), Some("fetch-user"));
        assert_eq!(snap.breakpoints["fetch-user"].hit_count, 1);
        assert!(snap.history.is_empty());

        let snap = session.step().await.unwrap();
        assert_eq!(snap.state, SessionState::Paused);
        assert_eq!(snap.current_index, 1);
        assert_eq!(snap.current_task.as_deref(), Some("fetch-orders"));
        assert_eq!(snap.context.tasks["fetch-user"].status, TaskStatus::Success);
        assert_eq!(snap.history.len(), 1);
        assert_eq!(snap.history[0].task_ref, "get-user");

        let snap = session.step().await.unwrap();
        assert_eq!(snap.state, SessionState::Paused);
        assert_eq!(snap.current_task.as_deref(), Some("process"));
        // fetch-orders saw the resolved name.
        let orders_output = snap.context.tasks["fetch-orders"].output.clone().unwrap();
        assert_eq!(orders_output["input"]["user"], "Ada");

        let snap = session.step().await.unwrap();
        assert_eq!(snap.state, SessionState::Completed);
        assert_eq!(snap.current_task, None);
        assert_eq!(snap.history.len(), 3);
    }

    #[tokio::test]
    async fn test_start_without_breakpoints_completes() {
        let mut session = session_with(MockExecutor::new());
        let snap = session.start().await.unwrap();
        assert_eq!(snap.state, SessionState::Completed);
        assert_eq!(snap.history.len(), 2);
        assert_eq!(snap.current_index, 2);
    }

    #[tokio::test]
    async fn test_continue_skips_current_breakpoint() {
        let mut session = session_with(MockExecutor::new());
        session.add_breakpoint("fetch-orders");

        let snap = session.start().await.unwrap();
        assert_eq!(snap.state, SessionState::Paused);
        assert_eq!(snap.current_task.as_deref(), Some("fetch-orders"));

        let snap = session.continue_run().await.unwrap();
        assert_eq!(snap.state, SessionState::Completed);
        assert_eq!(snap.breakpoints["fetch-orders"].hit_count, 1);
    }

    #[tokio::test]
    async fn test_disabled_breakpoint_is_ignored() {
        let mut session = session_with(MockExecutor::new());
        session.add_breakpoint("fetch-user");
        session.set_breakpoint_enabled("fetch-user", false).unwrap();

        let snap = session.start().await.unwrap();
        assert_eq!(snap.state, SessionState::Completed);
        assert_eq!(snap.breakpoints["fetch-user"].hit_count, 0);
        assert!(matches!(
            session.remove_breakpoint("nope"),
            Err(SessionError::UnknownBreakpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_task_failure_fails_session() {
        let mut session = session_with(MockExecutor::new().with_failure("get-user", "503 from upstream"));
        let snap = session.start().await.unwrap();

        assert_eq!(snap.state, SessionState::Failed);
        assert_eq!(snap.history.len(), 1);
        assert_eq!(snap.history[0].status, TaskStatus::Failed);
        assert!(snap.error.unwrap().contains("503"));
        assert!(matches!(
            session.step().await,
            Err(SessionError::InvalidState { state: SessionState::Failed, .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_then_step_is_invalid() {
        let mut session = session_with(MockExecutor::new());
        session.add_breakpoint("fetch-orders");
        session.start().await.unwrap();

        let before = session.snapshot();
        let snap = session.stop().unwrap();
        assert_eq!(snap.state, SessionState::Stopped);
        assert_eq!(snap.history, before.history);
        assert_eq!(snap.context, before.context);

        let err = session.step().await.unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidState {
                operation: "step",
                state: SessionState::Stopped
            }
        );
        assert!(session.stop().is_err());
        assert!(session.continue_run().await.is_err());
        assert_eq!(session.snapshot().history.len(), 1);
    }

    #[tokio::test]
    async fn test_start_only_from_ready() {
        let mut session = session_with(MockExecutor::new());
        session.step().await.unwrap();
        assert!(matches!(
            session.start().await,
            Err(SessionError::InvalidState { operation: "start", .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_response_overrides_executor() {
        let mut session = session_with(MockExecutor::new().with_failure("get-user", "boom"));
        session.set_mock_response("get-user", json!({ "name": "Grace" }));

        let snap = session.start().await.unwrap();
        assert_eq!(snap.state, SessionState::Completed);
        assert_eq!(snap.mocked_task_refs, vec!["get-user"]);
        assert_eq!(
            snap.context.tasks["fetch-user"].output,
            Some(json!({ "name": "Grace" }))
        );
    }

    #[tokio::test]
    async fn test_set_context_value_what_if() {
        let mut session = session_with(MockExecutor::new());
        session.add_breakpoint("fetch-orders");
        session.start().await.unwrap();

        let snap = session
            .set_context_value("tasks.fetch-user.output.name", json!("Linus"))
            .unwrap();
        assert_eq!(
            snap.context.tasks["fetch-user"].output.as_ref().unwrap()["name"],
            "Linus"
        );

        session.set_context_value("input.region", json!("eu")).unwrap();
        session.set_context_value("tasks.fetch-user.status", json!("failed")).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.context.input["region"], "eu");
        assert_eq!(snap.context.tasks["fetch-user"].status, TaskStatus::Failed);

        let snap = session.continue_run().await.unwrap();
        let orders = snap.context.tasks["fetch-orders"].output.clone().unwrap();
        assert_eq!(orders["input"]["user"], "Linus");

        assert!(matches!(
            session.set_context_value("input.x", json!(1)),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_context_value_rejects_bad_paths() {
        let mut session = session_with(MockExecutor::new());
        for path in ["", "secrets.token", "tasks", "tasks.a.bogus", "tasks.a.status.x"] {
            assert!(
                matches!(
                    session.set_context_value(path, json!("x")),
                    Err(SessionError::InvalidContextPath(_))
                ),
                "{path} should be rejected"
            );
        }
        assert!(session.set_context_value("tasks.a.status", json!("nonsense")).is_err());
    }

    #[test]
    fn test_cyclic_workflow_cannot_create_session() {
        let mut wf = user_workflow();
        wf.tasks[0].depends_on.push("fetch-orders".to_string());
        let err = DebugSession::create(
            wf,
            Vec::new(),
            json!({}),
            Arc::new(BoxTaskExecutor::new(MockExecutor::new())),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Plan(PlanError::CycleDetected { .. })));
    }
}
