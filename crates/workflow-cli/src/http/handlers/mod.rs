//! HTTP request handlers for the REST API.

pub mod debug;
pub mod workflow;

use serde::Deserialize;
use serde_json::Value;
use workflow_core::workflow::definition::{tasks_from_value, workflow_from_value};
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use crate::http::error::AppError;

/// Common request body: an inline workflow plus optional task definitions
/// and input.
#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    /// A `kind: Workflow` manifest or a flat workflow object.
    pub workflow: Value,
    #[serde(default)]
    pub tasks: Option<Value>,
    #[serde(default)]
    pub input: Option<Value>,
}

/// A request body converted into domain types.
pub struct ParsedRequest {
    pub workflow: WorkflowDefinition,
    pub tasks: Option<Vec<TaskDefinition>>,
    pub input: Value,
}

impl WorkflowRequest {
    pub fn parse(self) -> Result<ParsedRequest, AppError> {
        let workflow = workflow_from_value(self.workflow, "request.workflow")?;
        let tasks = self
            .tasks
            .map(|value| tasks_from_value(value, "request.tasks"))
            .transpose()?;
        let input = match self.input {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(value @ Value::Object(_)) => value,
            Some(_) => {
                return Err(AppError::BadRequest(
                    "workflow input must be a JSON object".to_string(),
                ));
            }
        };
        Ok(ParsedRequest {
            workflow,
            tasks,
            input,
        })
    }
}
