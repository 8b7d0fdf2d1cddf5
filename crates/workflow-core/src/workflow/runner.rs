//! Local workflow runner: group-by-group execution through a `TaskExecutor`.
//!
//! Tasks inside a group run concurrently via `tokio::JoinSet`; groups run
//! strictly in order. The first failing group stops the run. Each task
//! outcome is recorded once, with no retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::task::{Id, JoinSet};
use uuid::Uuid;
use workflow_types::debug::{ExecutionContext, TaskState, TaskStatus};
use workflow_types::execution::{RunStatus, TaskResult, WorkflowRunResult};
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use super::executor::{BoxTaskExecutor, ExecutionError, TaskInvocation};
use super::template;
use super::validator;

/// Default per-task timeout.
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 30;

/// Knobs for a local run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub task_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
        }
    }
}

/// Run a workflow to completion (or first failure).
///
/// Invalid workflows are not executed: the result is `failed` with the
/// first validation error. An empty `tasks` slice skips the task-reference
/// check.
pub async fn run_workflow(
    workflow: &WorkflowDefinition,
    tasks: &[TaskDefinition],
    input: Value,
    executor: Arc<BoxTaskExecutor>,
    options: &RunOptions,
) -> WorkflowRunResult {
    let execution_id = Uuid::now_v7().to_string();
    let started = Instant::now();

    let task_defs = (!tasks.is_empty()).then_some(tasks);
    let report = validator::validate(workflow, task_defs);
    if !report.valid {
        let error = report
            .error_messages()
            .into_iter()
            .next()
            .unwrap_or_else(|| "workflow is invalid".to_string());
        tracing::warn!(workflow = %workflow.name, %error, "refusing to run invalid workflow");
        return WorkflowRunResult {
            execution_id,
            status: RunStatus::Failed,
            output: Value::Null,
            duration_ms: elapsed_ms(started),
            task_results: Vec::new(),
            failed_task: None,
            error: Some(format!("workflow is invalid: {error}")),
        };
    }

    // Validation passed, so planning cannot hit a cycle.
    let plan = match super::planner::plan_workflow(workflow) {
        Ok(plan) => plan,
        Err(e) => {
            return WorkflowRunResult {
                execution_id,
                status: RunStatus::Failed,
                output: Value::Null,
                duration_ms: elapsed_ms(started),
                task_results: Vec::new(),
                failed_task: None,
                error: Some(e.to_string()),
            };
        }
    };

    let definitions: HashMap<&str, &TaskDefinition> =
        tasks.iter().map(|d| (d.name.as_str(), d)).collect();
    let mut context = ExecutionContext::new(input);
    let mut task_results: Vec<TaskResult> = Vec::new();

    tracing::info!(
        workflow = %workflow.name,
        %execution_id,
        groups = plan.groups.len(),
        "starting local run"
    );

    for group in &plan.groups {
        tracing::debug!(group = group.group_index, tasks = group.tasks.len(), "processing group");

        let template_context = context.to_template_context();
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<Id, (usize, String, String)> = HashMap::new();

        for (position, task_id) in group.tasks.iter().enumerate() {
            let Some(node) = workflow.task(task_id) else {
                continue;
            };
            let input_value = Value::Object(node.input.clone().into_iter().collect());
            let resolved = template::resolve_value(&input_value, &template_context);
            if !resolved.is_complete() {
                tracing::debug!(
                    task_id = %task_id,
                    unresolved = ?resolved.unresolved,
                    "task input has unresolved references"
                );
            }

            let invocation = TaskInvocation {
                workflow: workflow.name.clone(),
                namespace: workflow.namespace.clone(),
                task_id: node.id.clone(),
                task_ref: node.task_ref.clone(),
                input: resolved.value,
                definition: definitions.get(node.task_ref.as_str()).map(|d| (*d).clone()),
            };
            let executor = Arc::clone(&executor);
            let timeout = options.task_timeout;
            let spawned = (position, node.id.clone(), node.task_ref.clone());

            let handle = join_set.spawn(async move {
                let start = Instant::now();
                let result = tokio::time::timeout(timeout, executor.execute(&invocation))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ExecutionError::Timeout {
                            task_id: invocation.task_id.clone(),
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    });
                (result, elapsed_ms(start))
            });
            in_flight.insert(handle.id(), spawned);
        }

        let mut outcomes = Vec::with_capacity(group.tasks.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, Ok(outcome)),
                Err(e) => {
                    tracing::error!(error = %e, "task join error");
                    let message = if e.is_panic() {
                        "executor panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    (e.id(), Err(message))
                }
            };
            let Some((position, task_id, task_ref)) = in_flight.remove(&id) else {
                continue;
            };
            let (result, duration_ms) = outcome.unwrap_or_else(|message| {
                let error = ExecutionError::TaskFailed {
                    task_id: task_id.clone(),
                    message,
                };
                (Err(error), 0)
            });
            outcomes.push((position, task_id, task_ref, result, duration_ms));
        }
        // Record in declaration order regardless of completion order.
        outcomes.sort_by_key(|(position, ..)| *position);

        let mut failure: Option<(String, String)> = None;
        for (_, task_id, task_ref, result, duration_ms) in outcomes {
            let (state, status, output, error) = match result {
                Ok(output) => (
                    TaskState::success(output.clone()),
                    TaskStatus::Success,
                    Some(output),
                    None,
                ),
                Err(e) => {
                    let message = e.to_string();
                    if failure.is_none() {
                        failure = Some((task_id.clone(), message.clone()));
                    }
                    (
                        TaskState::failed(message.clone()),
                        TaskStatus::Failed,
                        None,
                        Some(message),
                    )
                }
            };
            context.tasks.insert(task_id.clone(), state);
            task_results.push(TaskResult {
                task_id,
                task_ref,
                status,
                output,
                error,
                duration_ms,
            });
        }

        if let Some((failed_task, error)) = failure {
            tracing::warn!(workflow = %workflow.name, %failed_task, %error, "run failed");
            return WorkflowRunResult {
                execution_id,
                status: RunStatus::Failed,
                output: Value::Null,
                duration_ms: elapsed_ms(started),
                task_results,
                failed_task: Some(failed_task),
                error: Some(error),
            };
        }
    }

    let output_value = Value::Object(workflow.output.clone().into_iter().collect());
    let output = template::resolve_value(&output_value, &context.to_template_context()).value;

    tracing::info!(workflow = %workflow.name, %execution_id, "run completed");

    WorkflowRunResult {
        execution_id,
        status: RunStatus::Success,
        output,
        duration_ms: elapsed_ms(started),
        task_results,
        failed_task: None,
        error: None,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
