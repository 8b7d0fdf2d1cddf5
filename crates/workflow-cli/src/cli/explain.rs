//! `workflow-cli explain`: execution groups, critical path, depth and width.

use std::process::ExitCode;

use anyhow::Result;
use console::style;
use workflow_core::workflow::analysis;
use workflow_core::workflow::graph;
use workflow_core::workflow::planner::PlanError;

use super::input::load_workflow;
use super::render::{format_path, plan_table, print_json};
use super::{GraphFormat, SourceArgs};
use crate::state::AppState;

pub async fn handle_explain(
    state: &AppState,
    source: &SourceArgs,
    graph: Option<GraphFormat>,
    json: bool,
) -> Result<ExitCode> {
    let loaded = load_workflow(state, source).await?;
    let workflow = &loaded.workflow;

    if let Some(format) = graph {
        if json {
            print_json(&analysis::graph_view(workflow))?;
        } else {
            let built = graph::build(workflow, None);
            let rendered = match format {
                GraphFormat::Dot => built.graph.to_dot(),
                GraphFormat::Mermaid => built.graph.to_mermaid(),
            };
            println!("{rendered}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let result = match analysis::analyze(workflow) {
        Ok(result) => result,
        Err(PlanError::CycleDetected { cycle }) => {
            if json {
                print_json(&serde_json::json!({
                    "workflow": workflow.name,
                    "error": "circular dependency",
                    "cycle": cycle,
                }))?;
            } else {
                println!();
                println!(
                    "  {} Cannot plan '{}': circular dependency {}",
                    style("✗").red().bold(),
                    style(&workflow.name).cyan(),
                    cycle.join(" -> ")
                );
                println!();
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    if json {
        print_json(&result)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!(
        "  {} {} {}",
        style("Workflow").bold(),
        style(&result.workflow).cyan().bold(),
        style(format!("({})", result.namespace)).dim()
    );
    if let Some(description) = &workflow.description {
        println!("  {}", style(description).dim());
    }
    println!();
    println!("{}", plan_table(&result.plan, &result.critical_path));
    println!();
    println!("  Tasks:           {}", result.task_count);
    println!("  Execution depth: {}", result.plan.execution_depth);
    println!("  Max parallelism: {}", result.plan.max_parallel_width);
    println!("  Critical path:   {}", format_path(&result.critical_path));
    println!("  {}", style("* task on the critical path").dim());
    println!();

    Ok(ExitCode::SUCCESS)
}
