//! Loading workflows, task definitions and input payloads for commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use workflow_core::workflow::definition::parse_input_json;
use workflow_core::workflow::loader::WorkflowLoader;
use workflow_infra::filesystem::load_input_file;
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

use super::{InputArgs, SourceArgs};
use crate::state::AppState;

/// A workflow plus whatever task definitions could be found for it.
#[derive(Debug, Clone)]
pub struct LoadedWorkflow {
    pub workflow: WorkflowDefinition,
    /// `None` when no task directory exists; task-reference checks are
    /// then skipped.
    pub tasks: Option<Vec<TaskDefinition>>,
}

impl LoadedWorkflow {
    pub fn task_defs(&self) -> Option<&[TaskDefinition]> {
        self.tasks.as_deref()
    }
}

/// Load the workflow file and its task definitions.
///
/// An explicit `--tasks-dir` must exist. The configured default is looked up
/// next to the workflow file and silently skipped when absent.
pub async fn load_workflow(state: &AppState, source: &SourceArgs) -> Result<LoadedWorkflow> {
    let workflow = state
        .loader
        .load_workflow(&source.file)
        .await
        .with_context(|| format!("Failed to load workflow {}", source.file.display()))?;

    let tasks = match &source.tasks_dir {
        Some(dir) => Some(
            state
                .loader
                .load_tasks_from_directory(dir)
                .await
                .with_context(|| format!("Failed to load task definitions from {}", dir.display()))?,
        ),
        None => {
            let dir = default_tasks_dir(&source.file, &state.config.tasks_dir);
            if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                Some(
                    state
                        .loader
                        .load_tasks_from_directory(&dir)
                        .await
                        .with_context(|| {
                            format!("Failed to load task definitions from {}", dir.display())
                        })?,
                )
            } else {
                tracing::debug!(dir = %dir.display(), "no task directory, skipping task-reference checks");
                None
            }
        }
    };

    Ok(LoadedWorkflow { workflow, tasks })
}

/// `tasks_dir` from config, resolved relative to the workflow file.
fn default_tasks_dir(workflow_file: &Path, tasks_dir: &str) -> PathBuf {
    let tasks_dir = Path::new(tasks_dir);
    if tasks_dir.is_absolute() {
        return tasks_dir.to_path_buf();
    }
    workflow_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(tasks_dir)
}

/// Resolve `--input-json` / `--input-file`; no input means `{}`.
pub async fn load_input(args: &InputArgs) -> Result<Value> {
    if let Some(raw) = &args.input_json {
        return Ok(parse_input_json(raw)?);
    }
    if let Some(path) = &args.input_file {
        return load_input_file(path)
            .await
            .with_context(|| format!("Failed to read input file {}", path.display()));
    }
    Ok(json!({}))
}

/// Read a `{taskRef: response}` mock file.
pub async fn load_mock_file(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read mock file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Mock file {} is not valid JSON", path.display()))?;
    anyhow::ensure!(
        value.is_object(),
        "Mock file {} must contain a JSON object keyed by taskRef",
        path.display()
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use workflow_infra::filesystem::scaffold;
    use workflow_types::config::CliConfig;

    #[test]
    fn test_default_tasks_dir_is_relative_to_workflow() {
        assert_eq!(
            default_tasks_dir(Path::new("demo/workflow.yaml"), "./tasks"),
            PathBuf::from("demo/./tasks")
        );
        assert_eq!(
            default_tasks_dir(Path::new("/abs/wf.yaml"), "/opt/tasks"),
            PathBuf::from("/opt/tasks")
        );
    }

    #[tokio::test]
    async fn test_load_workflow_finds_scaffolded_tasks() {
        let dir = tempdir().unwrap();
        let rendered = scaffold::render("parallel", "orders", "default").unwrap();
        scaffold::write_scaffold(&rendered, dir.path(), false).await.unwrap();

        let state = AppState::new(CliConfig::default());
        let source = SourceArgs {
            file: dir.path().join(scaffold::WORKFLOW_FILE),
            tasks_dir: None,
        };
        let loaded = load_workflow(&state, &source).await.unwrap();
        assert_eq!(loaded.workflow.name, "orders");
        assert_eq!(loaded.task_defs().map(<[_]>::len), Some(3));
    }

    #[tokio::test]
    async fn test_missing_workflow_error_keeps_os_message() {
        let state = AppState::new(CliConfig::default());
        let source = SourceArgs {
            file: PathBuf::from("/definitely/not/here.yaml"),
            tasks_dir: None,
        };
        let err = load_workflow(&state, &source).await.unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("here.yaml"));
        assert!(chain.contains("No such file"));
    }

    #[tokio::test]
    async fn test_load_input_variants() {
        let args = InputArgs::default();
        assert_eq!(load_input(&args).await.unwrap(), json!({}));

        let args = InputArgs {
            input_json: Some(r#"{"userId": "u-1"}"#.to_string()),
            input_file: None,
        };
        assert_eq!(load_input(&args).await.unwrap()["userId"], "u-1");

        let args = InputArgs {
            input_json: Some("{broken".to_string()),
            input_file: None,
        };
        let err = load_input(&args).await.unwrap_err();
        assert!(err.to_string().contains("invalid JSON input"));
    }
}
