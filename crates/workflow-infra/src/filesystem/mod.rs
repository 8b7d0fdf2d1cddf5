//! Filesystem adapters for workflow-cli.
//!
//! Implements the `WorkflowLoader` trait from `workflow-core` over real
//! files, plus the config-directory lookup and project scaffolding.

pub mod scaffold;

use std::path::{Path, PathBuf};

use serde_json::Value;
use workflow_core::workflow::definition::{self, DocumentFormat};
use workflow_core::workflow::loader::WorkflowLoader;
use workflow_types::error::LoadError;
use workflow_types::workflow::{TaskDefinition, WorkflowDefinition};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "WORKFLOW_CLI_CONFIG_DIR";

/// Loads definitions from the local filesystem.
///
/// All operations go through `tokio::fs` for async I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWorkflowLoader;

impl FsWorkflowLoader {
    pub fn new() -> Self {
        Self
    }
}

impl WorkflowLoader for FsWorkflowLoader {
    async fn load_workflow(&self, path: &Path) -> Result<WorkflowDefinition, LoadError> {
        let content = read_file(path).await?;
        let workflow = definition::parse_workflow(
            &content,
            DocumentFormat::from_path(path),
            &path.display().to_string(),
        )?;
        tracing::debug!(
            workflow = %workflow.name,
            tasks = workflow.tasks.len(),
            path = %path.display(),
            "loaded workflow"
        );
        Ok(workflow)
    }

    async fn load_tasks_from_directory(&self, path: &Path) -> Result<Vec<TaskDefinition>, LoadError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;

        // A single file is accepted too.
        let files = if metadata.is_file() {
            vec![path.to_path_buf()]
        } else {
            definition_files(path).await?
        };

        let mut defs = Vec::new();
        for file in &files {
            let content = read_file(file).await?;
            defs.extend(definition::parse_task_definitions(
                &content,
                DocumentFormat::from_path(file),
                &file.display().to_string(),
            )?);
        }

        tracing::debug!(
            dir = %path.display(),
            files = files.len(),
            tasks = defs.len(),
            "loaded task definitions"
        );
        Ok(defs)
    }
}

/// Every `.yaml`/`.yml`/`.json` file below `dir`, sorted by path.
///
/// Walks iteratively so deep trees do not grow the async state machine.
async fn definition_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| io_error(&current, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&current, e))?
        {
            let entry_path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| io_error(&entry_path, e))?;
            if file_type.is_dir() {
                pending.push(entry_path);
            } else if definition::is_definition_file(&entry_path) {
                files.push(entry_path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Read a workflow input payload (`--input-file`). Must hold a JSON object.
pub async fn load_input_file(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path).await?;
    definition::parse_input_json(&content)
}

async fn read_file(path: &Path) -> Result<String, LoadError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, err: std::io::Error) -> LoadError {
    let path = path.display().to_string();
    if err.kind() == std::io::ErrorKind::NotFound {
        LoadError::FileNotFound {
            path,
            message: err.to_string(),
        }
    } else {
        LoadError::Io {
            path,
            message: err.to_string(),
        }
    }
}

/// Resolve the config directory from environment or platform defaults.
///
/// Priority:
/// 1. `WORKFLOW_CLI_CONFIG_DIR` environment variable
/// 2. Platform config directory (e.g. `~/.config/workflow-cli` on Linux)
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(config) = dirs::config_dir() {
        return config.join("workflow-cli");
    }

    // Last resort: current directory
    PathBuf::from(".workflow-cli")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const WORKFLOW: &str = r#"
apiVersion: workflow.example.com/v1
kind: Workflow
metadata:
  name: user-orders
spec:
  tasks:
    - id: fetch-user
      taskRef: get-user
"#;

    const TASK: &str = r#"
apiVersion: workflow.example.com/v1
kind: WorkflowTask
metadata:
  name: get-user
spec:
  type: http
  http:
    url: http://localhost:8080/users
    method: GET
"#;

    #[tokio::test]
    async fn test_load_workflow_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workflow.yaml");
        tokio::fs::write(&path, WORKFLOW).await.unwrap();

        let wf = FsWorkflowLoader::new().load_workflow(&path).await.unwrap();
        assert_eq!(wf.name, "user-orders");
        assert_eq!(wf.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_workflow_is_file_not_found() {
        let dir = tempdir().unwrap();
        let err = FsWorkflowLoader::new()
            .load_workflow(&dir.path().join("nope.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(&err, LoadError::FileNotFound { path, .. } if path.ends_with("nope.yaml")));
    }

    #[tokio::test]
    async fn test_load_tasks_recurses_and_sorts() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(dir.path().join("b-user.yaml"), TASK).await.unwrap();
        tokio::fs::write(
            nested.join("orders.json"),
            r#"{"name": "get-orders", "type": "http", "http": {"url": "http://localhost/orders", "method": "GET"}}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("a-workflow.yaml"), WORKFLOW).await.unwrap();
        tokio::fs::write(dir.path().join("README.md"), "# not a task").await.unwrap();

        let defs = FsWorkflowLoader::new()
            .load_tasks_from_directory(dir.path())
            .await
            .unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["get-user", "get-orders"]);
    }

    #[tokio::test]
    async fn test_empty_and_missing_task_directories() {
        let dir = tempdir().unwrap();
        let loader = FsWorkflowLoader::new();
        assert!(loader.load_tasks_from_directory(dir.path()).await.unwrap().is_empty());

        let err = loader
            .load_tasks_from_directory(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        tokio::fs::write(&path, "kind: [").await.unwrap();

        let err = FsWorkflowLoader::new()
            .load_tasks_from_directory(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(&err, LoadError::Parse { path, .. } if path.ends_with("broken.yaml")));
    }

    #[tokio::test]
    async fn test_load_input_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.json");
        tokio::fs::write(&path, r#"{"userId": "u-1"}"#).await.unwrap();
        assert_eq!(load_input_file(&path).await.unwrap()["userId"], "u-1");

        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(matches!(
            load_input_file(&path).await,
            Err(LoadError::InvalidJsonInput(_))
        ));
    }

    #[test]
    fn test_resolve_config_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(CONFIG_DIR_ENV, "/tmp/test-workflow-cli");
        }
        let dir = resolve_config_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-workflow-cli"));
        unsafe {
            std::env::remove_var(CONFIG_DIR_ENV);
        }
    }
}
