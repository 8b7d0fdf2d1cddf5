//! Task executor abstraction.
//!
//! `TaskExecutor` runs one task invocation and returns its output. Real
//! network execution lives behind the Gateway; this crate ships only the
//! [`MockExecutor`] used by `run --mock`, dry runs and the debugger.
//!
//! Follows the same blanket-impl pattern as the other RPITIT traits:
//! 1. Define an object-safe `TaskExecutorDyn` trait with boxed futures
//! 2. Blanket-impl `TaskExecutorDyn` for all `T: TaskExecutor`
//! 3. `BoxTaskExecutor` wraps `Box<dyn TaskExecutorDyn>` and delegates

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use workflow_types::workflow::TaskDefinition;

// ---------------------------------------------------------------------------
// Invocation and errors
// ---------------------------------------------------------------------------

/// Everything an executor needs to run one task.
#[derive(Debug, Clone)]
pub struct TaskInvocation {
    pub workflow: String,
    pub namespace: String,
    pub task_id: String,
    pub task_ref: String,
    /// Task input with templates already resolved.
    pub input: Value,
    /// The matching task definition, when one was loaded.
    pub definition: Option<TaskDefinition>,
}

/// Errors from executing a single task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("task '{task_id}' failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("task '{task_id}' timed out after {timeout_ms}ms")]
    Timeout { task_id: String, timeout_ms: u64 },

    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// TaskExecutor trait
// ---------------------------------------------------------------------------

/// Runs a single task and yields its output.
///
/// Uses RPITIT (return-position `impl Trait` in traits) for async methods.
/// Retries are the executor's business; callers record each outcome as a
/// single attempt.
pub trait TaskExecutor: Send + Sync {
    fn execute(
        &self,
        invocation: &TaskInvocation,
    ) -> impl Future<Output = Result<Value, ExecutionError>> + Send;
}

/// Object-safe version of [`TaskExecutor`] with boxed futures.
pub trait TaskExecutorDyn: Send + Sync {
    fn execute_boxed<'a>(
        &'a self,
        invocation: &'a TaskInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ExecutionError>> + Send + 'a>>;
}

/// Blanket implementation: any `TaskExecutor` automatically implements `TaskExecutorDyn`.
impl<T: TaskExecutor> TaskExecutorDyn for T {
    fn execute_boxed<'a>(
        &'a self,
        invocation: &'a TaskInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ExecutionError>> + Send + 'a>> {
        Box::pin(self.execute(invocation))
    }
}

/// Type-erased task executor, so sessions and runners can be built around
/// whichever executor the command line selected.
pub struct BoxTaskExecutor {
    inner: Box<dyn TaskExecutorDyn + Send + Sync>,
}

impl BoxTaskExecutor {
    pub fn new<T: TaskExecutor + 'static>(executor: T) -> Self {
        Self {
            inner: Box::new(executor),
        }
    }

    pub async fn execute(&self, invocation: &TaskInvocation) -> Result<Value, ExecutionError> {
        self.inner.execute_boxed(invocation).await
    }
}

impl std::fmt::Debug for BoxTaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTaskExecutor").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// MockExecutor
// ---------------------------------------------------------------------------

/// Executor that never leaves the process.
///
/// Responses and failures are keyed by `taskRef`. Tasks without a canned
/// response succeed with `{"taskRef", "input", "mocked": true}`.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    responses: HashMap<String, Value>,
    failures: HashMap<String, String>,
    latency: Option<Duration>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned output for every task using `task_ref`.
    pub fn with_response(mut self, task_ref: impl Into<String>, response: Value) -> Self {
        self.responses.insert(task_ref.into(), response);
        self
    }

    /// Make every task using `task_ref` fail with `message`.
    pub fn with_failure(mut self, task_ref: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(task_ref.into(), message.into());
        self
    }

    /// Simulated per-task latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Load canned responses from a `{taskRef: output}` object.
    pub fn from_responses(responses: &Value) -> Self {
        let responses = responses
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self {
            responses,
            ..Self::default()
        }
    }
}

impl TaskExecutor for MockExecutor {
    async fn execute(&self, invocation: &TaskInvocation) -> Result<Value, ExecutionError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = self.failures.get(&invocation.task_ref) {
            return Err(ExecutionError::TaskFailed {
                task_id: invocation.task_id.clone(),
                message: message.clone(),
            });
        }

        tracing::debug!(
            task_id = %invocation.task_id,
            task_ref = %invocation.task_ref,
            "mock task executed"
        );

        Ok(self
            .responses
            .get(&invocation.task_ref)
            .cloned()
            .unwrap_or_else(|| {
                json!({
                    "taskRef": invocation.task_ref,
                    "input": invocation.input,
                    "mocked": true,
                })
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(task_ref: &str) -> TaskInvocation {
        TaskInvocation {
            workflow: "wf".to_string(),
            namespace: "default".to_string(),
            task_id: "step".to_string(),
            task_ref: task_ref.to_string(),
            input: json!({ "id": 7 }),
            definition: None,
        }
    }

    #[tokio::test]
    async fn test_mock_default_echoes_input() {
        let executor = BoxTaskExecutor::new(MockExecutor::new());
        let output = executor.execute(&invocation("get-user")).await.unwrap();
        assert_eq!(output["taskRef"], "get-user");
        assert_eq!(output["input"]["id"], 7);
        assert_eq!(output["mocked"], true);
    }

    #[tokio::test]
    async fn test_mock_canned_response_and_failure() {
        let executor = BoxTaskExecutor::new(
            MockExecutor::new()
                .with_response("get-user", json!({ "name": "Ada" }))
                .with_failure("charge", "card declined"),
        );

        let output = executor.execute(&invocation("get-user")).await.unwrap();
        assert_eq!(output, json!({ "name": "Ada" }));

        let err = executor.execute(&invocation("charge")).await.unwrap_err();
        assert_eq!(
            err,
            ExecutionError::TaskFailed {
                task_id: "step".to_string(),
                message: "card declined".to_string(),
            }
        );
        assert!(err.to_string().contains("card declined"));
    }

    #[tokio::test]
    async fn test_mock_from_responses_object() {
        let mock = MockExecutor::from_responses(&json!({ "a": { "ok": true }, "b": 3 }));
        assert_eq!(mock.execute(&invocation("b")).await.unwrap(), json!(3));
        assert_eq!(mock.execute(&invocation("a")).await.unwrap()["ok"], true);
    }
}
