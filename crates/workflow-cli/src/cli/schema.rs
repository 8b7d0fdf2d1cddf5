//! `workflow-cli schema`: JSON Schema for workflow and task manifests.

use std::process::ExitCode;

use anyhow::Result;
use workflow_types::workflow::Manifest;

use super::render::print_json;

pub fn manifest_schema() -> schemars::Schema {
    schemars::schema_for!(Manifest)
}

pub fn handle_schema() -> Result<ExitCode> {
    print_json(&manifest_schema())?;
    Ok(ExitCode::SUCCESS)
}
