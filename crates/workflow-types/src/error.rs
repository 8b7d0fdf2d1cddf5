use serde::Serialize;
use thiserror::Error;

/// A structural problem found while analysing a workflow definition.
///
/// Issues are data, not control flow: the graph builder and validator
/// collect them and keep going so callers get every diagnostic at once.
/// Each message contains the offending identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ValidationIssue {
    #[error("schema error: {message}")]
    Schema { message: String },

    #[error("duplicate task ID: '{task_id}'")]
    #[serde(rename_all = "camelCase")]
    DuplicateTaskId { task_id: String },

    #[error("task '{task_id}' references unknown task definition '{task_ref}'")]
    #[serde(rename_all = "camelCase")]
    MissingTaskReference { task_id: String, task_ref: String },

    #[error("task '{task_id}' depends on unknown task '{dependency}'")]
    #[serde(rename_all = "camelCase")]
    MissingDependency { task_id: String, dependency: String },

    #[error("output '{output_key}' references unknown task '{task_id}'")]
    #[serde(rename_all = "camelCase")]
    DanglingOutputReference { output_key: String, task_id: String },

    #[error("invalid template expression '{expression}' in {location}: {reason}")]
    InvalidTemplateExpression {
        location: String,
        expression: String,
        reason: String,
    },

    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// Errors raised while loading definitions, input payloads, or scaffolds.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The path does not exist. `message` is the underlying OS message.
    #[error("{path}: {message}")]
    FileNotFound { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid JSON input: {0}")]
    InvalidJsonInput(String),

    #[error("{path} already exists (use --force to overwrite)")]
    AlreadyExists { path: String },

    #[error("unknown template '{template}' (available: {})", available.join(", "))]
    UnknownTemplate {
        template: String,
        available: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_messages_contain_identifiers() {
        let err = ValidationIssue::MissingTaskReference {
            task_id: "fetch".to_string(),
            task_ref: "nonexistent-task".to_string(),
        };
        assert!(err.to_string().contains("nonexistent-task"));

        let err = ValidationIssue::CircularDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "circular dependency detected: a -> b -> a");
    }

    #[test]
    fn test_issue_serializes_with_kind_tag() {
        let err = ValidationIssue::DuplicateTaskId {
            task_id: "step-1".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "duplicate-task-id");
        assert_eq!(json["taskId"], "step-1");
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::FileNotFound {
            path: "wf.yaml".to_string(),
            message: "No such file or directory (os error 2)".to_string(),
        };
        assert_eq!(err.to_string(), "wf.yaml: No such file or directory (os error 2)");

        let err = LoadError::UnknownTemplate {
            template: "fancy".to_string(),
            available: vec!["basic".to_string(), "parallel".to_string()],
        };
        assert!(err.to_string().contains("fancy"));
        assert!(err.to_string().contains("basic, parallel"));
    }
}
