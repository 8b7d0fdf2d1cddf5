//! Shared terminal rendering for command output.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;
use workflow_types::debug::TaskStatus;
use workflow_types::execution::{DryRunPlan, RunStatus, WorkflowRunResult};
use workflow_types::plan::ExecutionPlan;
use workflow_types::validation::{CheckOutcome, ValidationReport};

/// Pretty-print any serializable value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn check_mark(ok: bool) -> String {
    if ok {
        format!("{}", style("✓").green())
    } else {
        format!("{}", style("✗").red())
    }
}

/// `a → b → c`, or a dim placeholder for an empty path.
pub fn format_path(path: &[String]) -> String {
    if path.is_empty() {
        return format!("{}", style("(none)").dim());
    }
    path.iter()
        .map(|t| style(t).cyan().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

pub fn plan_table(plan: &ExecutionPlan, critical_path: &[String]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Group").fg(Color::Cyan),
            Cell::new("Tasks"),
            Cell::new("Parallel"),
            Cell::new("Depends on"),
        ]);

    for group in &plan.groups {
        let tasks = group
            .tasks
            .iter()
            .map(|t| {
                if critical_path.contains(t) {
                    format!("{t} *")
                } else {
                    t.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let depends_on = if group.depends_on.is_empty() {
            "-".to_string()
        } else {
            group
                .depends_on
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            Cell::new(group.group_index),
            Cell::new(tasks),
            Cell::new(if group.parallel { "yes" } else { "no" }),
            Cell::new(depends_on),
        ]);
    }

    table
}

/// Table for the minimal `{tasks, parallel}` plan returned by the Gateway.
pub fn dry_run_plan_table(plan: &DryRunPlan) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Group").fg(Color::Cyan),
            Cell::new("Tasks"),
            Cell::new("Parallel"),
        ]);
    for (index, group) in plan.groups.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(group.tasks.join(", ")),
            Cell::new(if group.parallel { "yes" } else { "no" }),
        ]);
    }
    table
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn print_validation(report: &ValidationReport) {
    for check in &report.checks {
        match &check.outcome {
            CheckOutcome::Passed { message } => {
                println!("  {} {:<24} {}", check_mark(true), check.name, style(message).dim());
            }
            CheckOutcome::Failed { message, errors } => {
                println!("  {} {:<24} {}", check_mark(false), check.name, message);
                for error in errors {
                    println!("      {} {}", style("-").red(), error);
                }
            }
            CheckOutcome::Skipped { reason } => {
                println!(
                    "  {} {:<24} {}",
                    style("○").yellow(),
                    check.name,
                    style(format!("skipped: {reason}")).dim()
                );
            }
        }
    }
    print_warnings(&report.warnings);
}

pub fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("  {}", style("Warnings:").yellow().bold());
    for warning in warnings {
        println!("    {} {}", style("!").yellow(), warning);
    }
}

pub fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!();
    println!("  {}", style("Errors:").red().bold());
    for error in errors {
        println!("    {} {}", style("✗").red(), error);
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

pub fn print_run_result(result: &WorkflowRunResult) -> Result<()> {
    println!();
    match result.status {
        RunStatus::Success => println!(
            "  {} Run {} succeeded in {}ms",
            check_mark(true),
            style(&result.execution_id).dim(),
            result.duration_ms
        ),
        RunStatus::Failed => println!(
            "  {} Run {} failed in {}ms",
            check_mark(false),
            style(&result.execution_id).dim(),
            result.duration_ms
        ),
    }

    if !result.task_results.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Task").fg(Color::Cyan),
                Cell::new("Ref"),
                Cell::new("Status"),
                Cell::new("Duration"),
            ]);
        for task in &result.task_results {
            let status_color = match task.status {
                TaskStatus::Success => Color::Green,
                TaskStatus::Failed => Color::Red,
                TaskStatus::Pending | TaskStatus::Skipped => Color::Yellow,
            };
            table.add_row(vec![
                Cell::new(&task.task_id),
                Cell::new(&task.task_ref),
                Cell::new(task.status).fg(status_color),
                Cell::new(format!("{}ms", task.duration_ms)),
            ]);
        }
        println!("{table}");
    }

    if let Some(error) = &result.error {
        println!();
        match &result.failed_task {
            Some(task) => println!("  {} {}: {}", style("Error").red().bold(), style(task).cyan(), error),
            None => println!("  {} {}", style("Error").red().bold(), error),
        }
    }

    if result.is_success() {
        println!();
        println!("  {}", style("Output:").bold());
        for line in serde_json::to_string_pretty(&result.output)?.lines() {
            println!("    {line}");
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_types::plan::ExecutionGroup;

    #[test]
    fn test_plan_table_marks_critical_tasks() {
        console::set_colors_enabled(false);
        let plan = ExecutionPlan {
            groups: vec![
                ExecutionGroup {
                    group_index: 0,
                    tasks: vec!["a".into(), "b".into()],
                    parallel: true,
                    depends_on: vec![],
                },
                ExecutionGroup {
                    group_index: 1,
                    tasks: vec!["c".into()],
                    parallel: false,
                    depends_on: vec![0],
                },
            ],
            max_parallel_width: 2,
            execution_depth: 2,
        };
        let rendered = plan_table(&plan, &["a".to_string(), "c".to_string()]).to_string();
        assert!(rendered.contains("a *, b"));
        assert!(rendered.contains("c *"));
    }

    #[test]
    fn test_format_path_joins_with_arrows() {
        console::set_colors_enabled(false);
        assert_eq!(format_path(&["a".into(), "b".into()]), "a → b");
        assert_eq!(format_path(&[]), "(none)");
    }
}
