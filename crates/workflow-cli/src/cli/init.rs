//! `workflow-cli init` and `workflow-cli templates`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde_json::json;
use workflow_infra::filesystem::scaffold::{self, DEFAULT_TEMPLATE, TEMPLATES, WORKFLOW_FILE};

use super::render::print_json;
use crate::state::AppState;

pub struct InitArgs<'a> {
    pub name: &'a str,
    pub template: &'a str,
    pub dir: Option<&'a Path>,
    pub force: bool,
}

/// Scaffold a workflow project into `--dir` (default `./<name>`).
pub async fn handle_init(state: &AppState, args: InitArgs<'_>, json: bool) -> Result<ExitCode> {
    let name = args.name.trim();
    if name.is_empty() {
        anyhow::bail!("Workflow name must not be empty");
    }

    let dir = args
        .dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(name));
    let scaffold = scaffold::render(args.template, name, &state.config.namespace)?;
    let written = scaffold::write_scaffold(&scaffold, &dir, args.force)
        .await
        .with_context(|| format!("Failed to scaffold '{name}' in {}", dir.display()))?;

    if json {
        print_json(&json!({
            "workflow": name,
            "template": args.template,
            "directory": dir,
            "files": written,
        }))?;
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!(
        "  {} Created workflow {} from template {}",
        style("✓").green().bold(),
        style(name).cyan().bold(),
        style(args.template).cyan()
    );
    println!();
    for path in &written {
        println!("    {}", style(path.display()).dim());
    }
    println!();
    println!("  Next steps:");
    let workflow_path = dir.join(WORKFLOW_FILE);
    println!("    workflow-cli validate {}", workflow_path.display());
    println!("    workflow-cli explain {}", workflow_path.display());
    println!("    workflow-cli run {} --mock", workflow_path.display());
    println!();

    Ok(ExitCode::SUCCESS)
}

pub fn handle_templates(json: bool) -> Result<ExitCode> {
    if json {
        let templates: Vec<_> = TEMPLATES
            .iter()
            .map(|t| json!({ "id": t.id, "description": t.description, "default": t.id == DEFAULT_TEMPLATE }))
            .collect();
        print_json(&templates)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Template").fg(Color::Cyan),
            Cell::new("Description"),
        ]);
    for template in TEMPLATES {
        let id = if template.id == DEFAULT_TEMPLATE {
            format!("{} (default)", template.id)
        } else {
            template.id.to_string()
        };
        table.add_row(vec![Cell::new(id), Cell::new(template.description)]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_types::config::CliConfig;

    #[tokio::test]
    async fn test_init_writes_project_and_refuses_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(CliConfig::default());
        let dir = tmp.path().join("orders");

        let args = || InitArgs {
            name: "orders",
            template: "parallel",
            dir: Some(dir.as_path()),
            force: false,
        };

        handle_init(&state, args(), true).await.unwrap();
        assert!(dir.join(WORKFLOW_FILE).exists());

        let err = handle_init(&state, args(), true).await.unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));
    }

    #[tokio::test]
    async fn test_init_rejects_unknown_template() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(CliConfig::default());
        let args = InitArgs {
            name: "x",
            template: "nope",
            dir: Some(tmp.path()),
            force: false,
        };
        let err = handle_init(&state, args, true).await.unwrap_err();
        assert!(err.to_string().contains("unknown template 'nope'"));
    }
}
