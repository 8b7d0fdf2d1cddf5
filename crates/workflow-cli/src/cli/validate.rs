//! `workflow-cli validate`: every check with pass/fail/skip.

use std::process::ExitCode;

use anyhow::Result;
use console::style;
use workflow_core::workflow::validator;

use super::SourceArgs;
use super::input::load_workflow;
use super::render::{print_json, print_validation};
use crate::state::AppState;

pub async fn handle_validate(state: &AppState, source: &SourceArgs, json: bool) -> Result<ExitCode> {
    let loaded = load_workflow(state, source).await?;
    let report = validator::validate(&loaded.workflow, loaded.task_defs());

    tracing::info!(
        workflow = %loaded.workflow.name,
        valid = report.valid,
        errors = report.errors.len(),
        "validation finished"
    );

    if json {
        print_json(&report)?;
    } else {
        println!();
        println!(
            "  Validating {} {}",
            style(&loaded.workflow.name).cyan().bold(),
            style(format!("({})", source.file.display())).dim()
        );
        println!();
        print_validation(&report);
        println!();
        if report.valid {
            println!("  {} Workflow is valid", style("✓").green().bold());
        } else {
            println!(
                "  {} Workflow is invalid ({} error{})",
                style("✗").red().bold(),
                report.errors.len(),
                if report.errors.len() == 1 { "" } else { "s" }
            );
        }
        println!();
    }

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
