//! Project scaffolding for `workflow-cli init`.
//!
//! A scaffold is a workflow manifest plus the task manifests it references,
//! laid out as `<dir>/workflow.yaml` and `<dir>/tasks/<task>.yaml`. Every
//! template produces a workflow that passes validation against its own
//! task definitions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use workflow_core::workflow::definition::manifest_to_yaml;
use workflow_types::error::LoadError;
use workflow_types::workflow::{InputSchema, TaskDefinition, TaskNode, WorkflowDefinition};

/// Workflow manifest file name inside a scaffolded project.
pub const WORKFLOW_FILE: &str = "workflow.yaml";

/// Directory holding task manifests inside a scaffolded project.
pub const TASKS_DIR: &str = "tasks";

/// A named scaffold template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaffoldTemplate {
    pub id: &'static str,
    pub description: &'static str,
}

/// Every template `init` understands, in display order.
pub const TEMPLATES: &[ScaffoldTemplate] = &[
    ScaffoldTemplate {
        id: "basic",
        description: "Single HTTP task with an input field and output mapping",
    },
    ScaffoldTemplate {
        id: "sequential",
        description: "Three tasks chained through each other's outputs",
    },
    ScaffoldTemplate {
        id: "parallel",
        description: "Two independent fetches joined by a final task",
    },
];

/// Template used when `init` is given no `--template`.
pub const DEFAULT_TEMPLATE: &str = "basic";

/// A rendered scaffold, not yet written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaffold {
    pub workflow: WorkflowDefinition,
    pub tasks: Vec<TaskDefinition>,
}

/// Render a template for a workflow called `name`.
pub fn render(template: &str, name: &str, namespace: &str) -> Result<Scaffold, LoadError> {
    let mut scaffold = match template {
        "basic" => basic(name),
        "sequential" => sequential(name),
        "parallel" => parallel(name),
        other => {
            return Err(LoadError::UnknownTemplate {
                template: other.to_string(),
                available: TEMPLATES.iter().map(|t| t.id.to_string()).collect(),
            });
        }
    };

    scaffold.workflow.namespace = namespace.to_string();
    for task in &mut scaffold.tasks {
        task.namespace = namespace.to_string();
    }
    Ok(scaffold)
}

impl Scaffold {
    /// Relative file paths and their YAML content.
    pub fn files(&self) -> Result<Vec<(PathBuf, String)>, LoadError> {
        let mut files = vec![(
            PathBuf::from(WORKFLOW_FILE),
            manifest_to_yaml(&self.workflow.to_manifest())?,
        )];
        for task in &self.tasks {
            files.push((
                Path::new(TASKS_DIR).join(format!("{}.yaml", task.name)),
                manifest_to_yaml(&task.to_manifest())?,
            ));
        }
        Ok(files)
    }
}

/// Write a scaffold under `dir` and return the written paths.
///
/// Without `force`, nothing is written if any target file already exists.
pub async fn write_scaffold(
    scaffold: &Scaffold,
    dir: &Path,
    force: bool,
) -> Result<Vec<PathBuf>, LoadError> {
    let files = scaffold.files()?;

    if !force {
        for (relative, _) in &files {
            let target = dir.join(relative);
            if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                return Err(LoadError::AlreadyExists {
                    path: target.display().to_string(),
                });
            }
        }
    }

    let mut written = Vec::with_capacity(files.len());
    for (relative, content) in files {
        let target = dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| io_error(&target, e))?;
        written.push(target);
    }

    tracing::info!(
        workflow = %scaffold.workflow.name,
        dir = %dir.display(),
        files = written.len(),
        "scaffolded workflow"
    );
    Ok(written)
}

fn io_error(path: &Path, err: std::io::Error) -> LoadError {
    LoadError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn workflow(name: &str, description: &str, input: InputSchema, tasks: Vec<TaskNode>) -> WorkflowDefinition {
    WorkflowDefinition {
        name: name.to_string(),
        namespace: String::new(),
        description: Some(description.to_string()),
        input: Some(input),
        tasks,
        output: BTreeMap::new(),
    }
}

fn object_schema(fields: &[(&str, &str)], required: &[&str]) -> InputSchema {
    InputSchema {
        schema_type: Some("object".to_string()),
        properties: fields
            .iter()
            .map(|(field, ty)| (field.to_string(), json!({ "type": ty })))
            .collect(),
        required: required.iter().map(|r| r.to_string()).collect(),
    }
}

fn http_task(name: &str, method: &str, url: &str, description: &str) -> TaskDefinition {
    let mut task = TaskDefinition::http(name, method, url);
    task.description = Some(description.to_string());
    task
}

fn output(entries: &[(&str, &str)]) -> BTreeMap<String, Value> {
    entries
        .iter()
        .map(|(key, template)| (key.to_string(), Value::String(template.to_string())))
        .collect()
}

fn basic(name: &str) -> Scaffold {
    let mut wf = workflow(
        name,
        "Calls a single HTTP endpoint",
        object_schema(&[("message", "string")], &["message"]),
        vec![TaskNode::new("echo", "http-echo", &[]).with_input("message", json!("{{input.message}}"))],
    );
    wf.output = output(&[("result", "{{tasks.echo.output}}")]);

    Scaffold {
        workflow: wf,
        tasks: vec![http_task(
            "http-echo",
            "POST",
            "https://httpbin.org/anything",
            "Echoes its input back",
        )],
    }
}

fn sequential(name: &str) -> Scaffold {
    let mut wf = workflow(
        name,
        "Fetches a user, then their orders, then summarizes them",
        object_schema(&[("userId", "string")], &["userId"]),
        vec![
            TaskNode::new("fetch-user", "get-user", &[]).with_input("id", json!("{{input.userId}}")),
            TaskNode::new("fetch-orders", "get-orders", &["fetch-user"])
                .with_input("userId", json!("{{tasks.fetch-user.output.id}}")),
            TaskNode::new("summarize", "summarize-orders", &["fetch-orders"])
                .with_input("user", json!("{{tasks.fetch-user.output}}"))
                .with_input("orders", json!("{{tasks.fetch-orders.output}}")),
        ],
    );
    wf.output = output(&[
        ("summary", "{{tasks.summarize.output}}"),
        ("userName", "{{tasks.fetch-user.output.name}}"),
    ]);

    Scaffold {
        workflow: wf,
        tasks: vec![
            http_task(
                "get-user",
                "GET",
                "https://jsonplaceholder.typicode.com/users/{{input.id}}",
                "Fetch a user by ID",
            ),
            http_task(
                "get-orders",
                "GET",
                "https://jsonplaceholder.typicode.com/posts?userId={{input.userId}}",
                "Fetch the orders of a user",
            ),
            http_task(
                "summarize-orders",
                "POST",
                "https://httpbin.org/anything",
                "Summarize a user's orders",
            ),
        ],
    }
}

fn parallel(name: &str) -> Scaffold {
    let mut wf = workflow(
        name,
        "Fetches a user and inventory in parallel, then creates an order",
        object_schema(&[("userId", "string"), ("productId", "string")], &["userId", "productId"]),
        vec![
            TaskNode::new("fetch-user", "get-user", &[]).with_input("id", json!("{{input.userId}}")),
            TaskNode::new("fetch-inventory", "get-inventory", &[])
                .with_input("productId", json!("{{input.productId}}")),
            TaskNode::new("process-order", "create-order", &["fetch-user", "fetch-inventory"])
                .with_input("user", json!("{{tasks.fetch-user.output}}"))
                .with_input("stock", json!("{{tasks.fetch-inventory.output.available}}")),
        ],
    );
    wf.output = output(&[("order", "{{tasks.process-order.output}}")]);

    Scaffold {
        workflow: wf,
        tasks: vec![
            http_task(
                "get-user",
                "GET",
                "https://jsonplaceholder.typicode.com/users/{{input.id}}",
                "Fetch a user by ID",
            ),
            http_task(
                "get-inventory",
                "GET",
                "https://httpbin.org/anything/inventory/{{input.productId}}",
                "Look up stock for a product",
            ),
            http_task(
                "create-order",
                "POST",
                "https://httpbin.org/anything/orders",
                "Create an order",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use workflow_core::workflow::loader::WorkflowLoader;
    use workflow_core::workflow::{planner, validator};

    use crate::filesystem::FsWorkflowLoader;

    #[test]
    fn every_template_validates_against_its_tasks() {
        for template in TEMPLATES {
            let scaffold = render(template.id, "demo", "default").unwrap();
            let report = validator::validate(&scaffold.workflow, Some(&scaffold.tasks));
            assert!(
                report.valid,
                "template {} invalid: {:?}",
                template.id,
                report.error_messages()
            );
        }
    }

    #[test]
    fn parallel_template_plans_two_groups() {
        let scaffold = render("parallel", "orders", "shop").unwrap();
        let plan = planner::plan_workflow(&scaffold.workflow).unwrap();
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].tasks, vec!["fetch-user", "fetch-inventory"]);
        assert_eq!(plan.max_parallel_width, 2);
        assert!(scaffold.tasks.iter().all(|t| t.namespace == "shop"));
    }

    #[test]
    fn unknown_template_lists_available() {
        let err = render("fancy", "demo", "default").unwrap_err();
        match &err {
            LoadError::UnknownTemplate { template, available } => {
                assert_eq!(template, "fancy");
                assert_eq!(available, &vec!["basic", "sequential", "parallel"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("basic, sequential, parallel"));
    }

    #[tokio::test]
    async fn write_scaffold_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let scaffold = render("sequential", "user-orders", "default").unwrap();

        let written = write_scaffold(&scaffold, dir.path(), false).await.unwrap();
        assert_eq!(written.len(), 4);

        let loader = FsWorkflowLoader::new();
        let wf = loader
            .load_workflow(&dir.path().join(WORKFLOW_FILE))
            .await
            .unwrap();
        assert_eq!(wf, scaffold.workflow);

        let tasks = loader
            .load_tasks_from_directory(&dir.path().join(TASKS_DIR))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 3);
    }

    #[tokio::test]
    async fn write_scaffold_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let scaffold = render("basic", "hello", "default").unwrap();
        write_scaffold(&scaffold, dir.path(), false).await.unwrap();

        let err = write_scaffold(&scaffold, dir.path(), false).await.unwrap_err();
        assert!(matches!(err, LoadError::AlreadyExists { .. }));

        let written = write_scaffold(&scaffold, dir.path(), true).await.unwrap();
        assert_eq!(written.len(), 2);
    }
}
