//! Workflow and task definition parsing.
//!
//! Converts YAML/JSON documents into the canonical `WorkflowDefinition` /
//! `TaskDefinition` IR. Documents may be Kubernetes-style manifests
//! (`apiVersion`/`kind`/`metadata`/`spec`) or the flat IR itself; the
//! presence of a `kind` field decides which.
//!
//! Parsing does no structural validation. That is the validator's job.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use workflow_types::error::LoadError;
use workflow_types::workflow::{Manifest, TaskDefinition, WorkflowDefinition};

/// On-disk document format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` is JSON; everything else is treated as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Whether a path looks like a definition file.
pub fn is_definition_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a single workflow document. `source` names the document in errors.
pub fn parse_workflow(
    content: &str,
    format: DocumentFormat,
    source: &str,
) -> Result<WorkflowDefinition, LoadError> {
    let value = parse_documents(content, format, source)?
        .into_iter()
        .next()
        .ok_or_else(|| parse_error(source, "document is empty"))?;
    workflow_from_value(value, source)
}

/// Parse every task definition in a document.
///
/// YAML files may hold several `---`-separated documents and JSON files may
/// hold an array. `kind: Workflow` documents are skipped so task and
/// workflow manifests can share a directory.
pub fn parse_task_definitions(
    content: &str,
    format: DocumentFormat,
    source: &str,
) -> Result<Vec<TaskDefinition>, LoadError> {
    let mut defs = Vec::new();
    for value in parse_documents(content, format, source)? {
        defs.extend(tasks_from_value(value, source)?);
    }
    Ok(defs)
}

/// Convert a JSON value (e.g. an HTTP request body) into a workflow.
pub fn workflow_from_value(value: Value, source: &str) -> Result<WorkflowDefinition, LoadError> {
    if value.get("kind").is_some() {
        match serde_json::from_value::<Manifest>(value).map_err(|e| parse_error(source, e))? {
            Manifest::Workflow(manifest) => Ok(manifest.into_definition()),
            other => Err(parse_error(
                source,
                format!("expected kind Workflow, found {}", other.kind()),
            )),
        }
    } else {
        serde_json::from_value(value).map_err(|e| parse_error(source, e))
    }
}

/// Convert a JSON value holding one task definition or an array of them.
/// Workflow manifests in the array are skipped.
pub fn tasks_from_value(value: Value, source: &str) -> Result<Vec<TaskDefinition>, LoadError> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    let mut defs = Vec::with_capacity(items.len());
    for item in items {
        if let Some(def) = task_from_value(item, source)? {
            defs.push(def);
        }
    }
    Ok(defs)
}

fn task_from_value(value: Value, source: &str) -> Result<Option<TaskDefinition>, LoadError> {
    if value.get("kind").is_some() {
        match serde_json::from_value::<Manifest>(value).map_err(|e| parse_error(source, e))? {
            Manifest::WorkflowTask(manifest) => Ok(Some(manifest.into_definition())),
            Manifest::Workflow(manifest) => {
                tracing::debug!(
                    source,
                    workflow = %manifest.metadata.name,
                    "skipping workflow manifest in task directory"
                );
                Ok(None)
            }
        }
    } else {
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| parse_error(source, e))
    }
}

fn parse_documents(content: &str, format: DocumentFormat, source: &str) -> Result<Vec<Value>, LoadError> {
    match format {
        DocumentFormat::Json => {
            let value: Value = serde_json::from_str(content).map_err(|e| parse_error(source, e))?;
            Ok(vec![value])
        }
        DocumentFormat::Yaml => {
            let mut docs = Vec::new();
            for document in serde_yaml_ng::Deserializer::from_str(content) {
                let value = Value::deserialize(document).map_err(|e| parse_error(source, e))?;
                if !value.is_null() {
                    docs.push(value);
                }
            }
            Ok(docs)
        }
    }
}

fn parse_error(source: &str, message: impl ToString) -> LoadError {
    LoadError::Parse {
        path: source.to_string(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Serialization and input
// ---------------------------------------------------------------------------

/// Render a manifest as YAML.
pub fn manifest_to_yaml(manifest: &Manifest) -> Result<String, LoadError> {
    serde_yaml_ng::to_string(manifest).map_err(|e| parse_error("<manifest>", e))
}

/// Parse a `--input-json` payload. The payload must be a JSON object.
pub fn parse_input_json(raw: &str) -> Result<Value, LoadError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| LoadError::InvalidJsonInput(e.to_string()))?;
    if !value.is_object() {
        return Err(LoadError::InvalidJsonInput(
            "workflow input must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}
