//! Workflow domain types.
//!
//! Defines the canonical intermediate representation for workflows and task
//! definitions. Files on disk use a Kubernetes-style envelope (`apiVersion`,
//! `kind`, `metadata`, `spec`); the loader converts those manifests into the
//! flat `WorkflowDefinition` / `TaskDefinition` structs that every analysis
//! component works on.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API group/version written into generated manifests.
pub const API_VERSION: &str = "workflow.example.com/v1";

/// Namespace used when a manifest does not specify one.
pub const DEFAULT_NAMESPACE: &str = "default";

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

// ---------------------------------------------------------------------------
// Workflow Definition (canonical IR)
// ---------------------------------------------------------------------------

/// The canonical workflow definition.
///
/// Manifests, HTTP request bodies and scaffolds all convert to this struct.
/// It is deliberately not validated on construction: the validator reports
/// structural problems as data so callers can render partial diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Workflow name (must be non-empty).
    pub name: String,
    /// Namespace the workflow lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-Schema-like description of the workflow input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSchema>,
    /// Ordered list of tasks forming the workflow DAG.
    pub tasks: Vec<TaskNode>,
    /// Output mapping: key -> template expression.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output: BTreeMap<String, Value>,
}

impl WorkflowDefinition {
    /// Look up a task by ID (first occurrence wins for duplicated IDs).
    pub fn task(&self, id: &str) -> Option<&TaskNode> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Task IDs in declaration order (duplicates included).
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    /// Input fields declared by the input schema.
    ///
    /// Returns `None` when the workflow declares no schema or the schema has
    /// no `properties`, in which case input references cannot be checked.
    pub fn declared_input_fields(&self) -> Option<BTreeSet<&str>> {
        let schema = self.input.as_ref()?;
        if schema.properties.is_empty() {
            return None;
        }
        Some(schema.properties.keys().map(String::as_str).collect())
    }

    /// Wrap this definition in a `kind: Workflow` manifest envelope.
    pub fn to_manifest(&self) -> Manifest {
        Manifest::Workflow(WorkflowManifest {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta {
                name: self.name.clone(),
                namespace: Some(self.namespace.clone()),
                labels: BTreeMap::new(),
                annotations: BTreeMap::new(),
            },
            spec: WorkflowSpec {
                description: self.description.clone(),
                input: self.input.clone(),
                tasks: self.tasks.clone(),
                output: self.output.clone(),
            },
        })
    }
}

/// JSON-Schema-like description of a workflow's input object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InputSchema {
    /// Schema type (normally `object`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Declared input fields and their schemas.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    /// Fields that must be supplied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

// ---------------------------------------------------------------------------
// Task Node
// ---------------------------------------------------------------------------

/// A single step in the workflow DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    /// User-defined task ID (e.g. "fetch-user"). Unique within a workflow.
    pub id: String,
    /// Name of the external task definition this step invokes.
    pub task_ref: String,
    /// Explicit predecessor task IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Input bindings: literals or `{{...}}` template expressions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input: BTreeMap<String, Value>,
}

impl TaskNode {
    /// Build a task node with no input bindings.
    pub fn new(id: impl Into<String>, task_ref: impl Into<String>, depends_on: &[&str]) -> Self {
        Self {
            id: id.into(),
            task_ref: task_ref.into(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            input: BTreeMap::new(),
        }
    }

    /// Add an input binding (builder style, mostly for tests and scaffolds).
    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Task Definition
// ---------------------------------------------------------------------------

/// An external task definition (`kind: WorkflowTask`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    /// Task name referenced by `TaskNode::task_ref`.
    pub name: String,
    /// Namespace the task lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The kind of task.
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    /// HTTP invocation details for `http` tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpTaskSpec>,
    /// Schema of the task input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Schema of the task output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

impl TaskDefinition {
    /// Build a bare HTTP task definition.
    pub fn http(name: impl Into<String>, method: &str, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            description: None,
            task_type: TaskType::Http,
            http: Some(HttpTaskSpec {
                url: url.into(),
                method: method.to_string(),
                headers: BTreeMap::new(),
                body: None,
            }),
            input_schema: None,
            output_schema: None,
        }
    }

    /// Wrap this definition in a `kind: WorkflowTask` manifest envelope.
    pub fn to_manifest(&self) -> Manifest {
        Manifest::WorkflowTask(TaskManifest {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta {
                name: self.name.clone(),
                namespace: Some(self.namespace.clone()),
                labels: BTreeMap::new(),
                annotations: BTreeMap::new(),
            },
            spec: TaskSpec {
                description: self.description.clone(),
                task_type: self.task_type,
                http: self.http.clone(),
                input_schema: self.input_schema.clone(),
                output_schema: self.output_schema.clone(),
            },
        })
    }
}

/// The kind of external task.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Http,
}

/// HTTP request template for an `http` task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpTaskSpec {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

// ---------------------------------------------------------------------------
// Manifest envelopes
// ---------------------------------------------------------------------------

/// A manifest file, discriminated by its `kind` field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind")]
pub enum Manifest {
    Workflow(WorkflowManifest),
    WorkflowTask(TaskManifest),
}

impl Manifest {
    /// The `kind` string of this manifest.
    pub fn kind(&self) -> &'static str {
        match self {
            Manifest::Workflow(_) => "Workflow",
            Manifest::WorkflowTask(_) => "WorkflowTask",
        }
    }
}

/// Manifest metadata block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// `kind: Workflow` manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowManifest {
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: WorkflowSpec,
}

/// Body of a `kind: Workflow` manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSchema>,
    #[serde(default)]
    pub tasks: Vec<TaskNode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output: BTreeMap<String, Value>,
}

impl WorkflowManifest {
    /// Flatten the envelope into the canonical definition.
    pub fn into_definition(self) -> WorkflowDefinition {
        WorkflowDefinition {
            name: self.metadata.name,
            namespace: self.metadata.namespace.unwrap_or_else(default_namespace),
            description: self.spec.description,
            input: self.spec.input,
            tasks: self.spec.tasks,
            output: self.spec.output,
        }
    }
}

/// `kind: WorkflowTask` manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskManifest {
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: TaskSpec,
}

/// Body of a `kind: WorkflowTask` manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpTaskSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

impl TaskManifest {
    /// Flatten the envelope into a task definition.
    pub fn into_definition(self) -> TaskDefinition {
        TaskDefinition {
            name: self.metadata.name,
            namespace: self.metadata.namespace.unwrap_or_else(default_namespace),
            description: self.spec.description,
            task_type: self.spec.task_type,
            http: self.spec.http,
            input_schema: self.spec.input_schema,
            output_schema: self.spec.output_schema,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
