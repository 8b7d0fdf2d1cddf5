//! `workflow-cli run`: execute locally with mocks or through the Gateway.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use workflow_core::workflow::executor::{BoxTaskExecutor, MockExecutor};
use workflow_core::workflow::runner::{RunOptions, run_workflow};

use super::input::{load_input, load_mock_file, load_workflow};
use super::render::{print_json, print_run_result};
use super::{InputArgs, SourceArgs};
use crate::state::AppState;

pub struct RunArgs<'a> {
    pub source: &'a SourceArgs,
    pub input: &'a InputArgs,
    pub mock: bool,
    pub mock_file: Option<&'a std::path::Path>,
    pub timeout_secs: u64,
}

pub async fn handle_run(state: &AppState, args: RunArgs<'_>, json: bool) -> Result<ExitCode> {
    let loaded = load_workflow(state, args.source).await?;
    let input = load_input(args.input).await?;
    let local = args.mock || args.mock_file.is_some();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = if local {
        let responses = match args.mock_file {
            Some(path) => load_mock_file(path).await?,
            None => json!({}),
        };
        let executor = Arc::new(BoxTaskExecutor::new(MockExecutor::from_responses(&responses)));
        let options = RunOptions {
            task_timeout: Duration::from_secs(args.timeout_secs),
        };

        spinner.set_message(format!("Running '{}' with mocks...", loaded.workflow.name));
        let tasks = loaded.tasks.clone().unwrap_or_default();
        run_workflow(&loaded.workflow, &tasks, input, executor, &options).await
    } else {
        let gateway = state.gateway();
        spinner.set_message(format!(
            "Executing '{}' on {}...",
            loaded.workflow.name,
            gateway.base_url()
        ));
        let result = gateway
            .execute_workflow(&loaded.workflow.name, &input, Some(&state.config.namespace))
            .await;
        spinner.finish_and_clear();
        result.with_context(|| format!("Gateway execution of '{}' failed", loaded.workflow.name))?
    };
    spinner.finish_and_clear();

    tracing::info!(
        workflow = %loaded.workflow.name,
        execution_id = %result.execution_id,
        success = result.is_success(),
        local,
        "run finished"
    );

    if json {
        print_json(&result)?;
    } else {
        print_run_result(&result)?;
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
