//! CLI command definitions for the `workflow-cli` binary.
//!
//! Uses clap derive macros for argument parsing. Every command that reads a
//! workflow takes the manifest path as its first positional argument.

pub mod debug;
pub mod explain;
pub mod init;
pub mod input;
pub mod render;
pub mod run;
pub mod schema;
pub mod validate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Author, validate, explain, dry-run and debug declarative HTTP workflows.
#[derive(Parser)]
#[command(name = "workflow-cli", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Only log errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    /// Gateway base URL (overrides config.toml).
    #[arg(long, global = true, env = "WORKFLOW_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Namespace (overrides config.toml).
    #[arg(short, long, global = true, env = "WORKFLOW_NAMESPACE")]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show execution groups, critical path, depth and width.
    Explain {
        #[command(flatten)]
        source: SourceArgs,

        /// Render the dependency graph instead of the plan.
        #[arg(long, value_enum)]
        graph: Option<GraphFormat>,
    },

    /// Run every validation check and report pass/fail/skip.
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Dry run: plan, resolve templates and report errors without executing.
    Test {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Ask the Gateway to dry-run the deployed workflow instead.
        #[arg(long)]
        remote: bool,
    },

    /// Execute a workflow, locally with mocks or through the Gateway.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Run locally with the mock executor instead of the Gateway.
        #[arg(long)]
        mock: bool,

        /// JSON object of canned responses keyed by taskRef (implies --mock).
        #[arg(long)]
        mock_file: Option<PathBuf>,

        /// Per-task timeout in seconds for local runs.
        #[arg(long, default_value_t = workflow_core::workflow::runner::DEFAULT_TASK_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Step through a workflow interactively with breakpoints and mocks.
    Debug {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Set a breakpoint on a task (repeatable).
        #[arg(long = "break", value_name = "TASK_ID")]
        breakpoints: Vec<String>,

        /// JSON object of canned responses keyed by taskRef.
        #[arg(long)]
        mock_file: Option<PathBuf>,

        /// Run these debugger commands instead of prompting (repeatable).
        #[arg(long = "exec", value_name = "COMMAND")]
        commands: Vec<String>,
    },

    /// Scaffold a new workflow project.
    Init {
        /// Workflow name.
        name: String,

        /// Scaffold template (see `workflow-cli templates`).
        #[arg(short, long, default_value = workflow_infra::filesystem::scaffold::DEFAULT_TEMPLATE)]
        template: String,

        /// Target directory (defaults to ./<name>).
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Overwrite existing files.
        #[arg(long)]
        force: bool,
    },

    /// List available scaffold templates.
    Templates,

    /// Print the JSON Schema of workflow and task manifests.
    Schema,

    /// Start the REST API server.
    Serve {
        /// Port to listen on (overrides config.toml).
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to (overrides config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Where to read the workflow and its task definitions from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Workflow manifest (YAML or JSON).
    pub file: PathBuf,

    /// Directory of task definitions. Defaults to `tasks_dir` from
    /// config.toml, resolved next to the workflow file.
    #[arg(long)]
    pub tasks_dir: Option<PathBuf>,
}

/// Workflow input payload.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Input as an inline JSON object.
    #[arg(long, conflicts_with = "input_file")]
    pub input_json: Option<String>,

    /// Input read from a JSON file.
    #[arg(long)]
    pub input_file: Option<PathBuf>,
}

/// Output format for `explain --graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Dot,
    Mermaid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_explain_with_graph() {
        let cli = Cli::try_parse_from(["workflow-cli", "explain", "wf.yaml", "--graph", "mermaid"]).unwrap();
        match cli.command {
            Commands::Explain { source, graph } => {
                assert_eq!(source.file, PathBuf::from("wf.yaml"));
                assert_eq!(graph, Some(GraphFormat::Mermaid));
            }
            _ => panic!("expected explain"),
        }
    }

    #[test]
    fn test_input_flags_conflict() {
        let result = Cli::try_parse_from([
            "workflow-cli",
            "test",
            "wf.yaml",
            "--input-json",
            "{}",
            "--input-file",
            "in.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_collects_repeatable_flags() {
        let cli = Cli::try_parse_from([
            "workflow-cli",
            "debug",
            "wf.yaml",
            "--break",
            "a",
            "--break",
            "b",
            "--exec",
            "start",
        ])
        .unwrap();
        match cli.command {
            Commands::Debug {
                breakpoints,
                commands,
                ..
            } => {
                assert_eq!(breakpoints, vec!["a", "b"]);
                assert_eq!(commands, vec!["start"]);
            }
            _ => panic!("expected debug"),
        }
    }
}
