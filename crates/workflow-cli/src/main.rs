//! workflow-cli entry point.
//!
//! Parses CLI arguments, sets up tracing and configuration, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use workflow_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(verbosity_filter(cli.verbose, cli.quiet), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let json = cli.json;
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if json {
                let body = serde_json::json!({ "error": format!("{e:#}") });
                println!("{body}");
            } else {
                eprintln!("  {} {e:#}", console::style("Error:").red().bold());
            }
            ExitCode::FAILURE
        }
    };

    shutdown_tracing();
    code
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "workflow-cli", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let state = AppState::init(cli.gateway_url.as_deref(), cli.namespace.as_deref()).await;
    let json = cli.json;

    match cli.command {
        Commands::Explain { source, graph } => {
            cli::explain::handle_explain(&state, &source, graph, json).await
        }

        Commands::Validate { source } => cli::validate::handle_validate(&state, &source, json).await,

        Commands::Test {
            source,
            input,
            remote,
        } => cli::test::handle_test(&state, &source, &input, remote, json).await,

        Commands::Run {
            source,
            input,
            mock,
            mock_file,
            timeout,
        } => {
            let args = cli::run::RunArgs {
                source: &source,
                input: &input,
                mock,
                mock_file: mock_file.as_deref(),
                timeout_secs: timeout,
            };
            cli::run::handle_run(&state, args, json).await
        }

        Commands::Debug {
            source,
            input,
            breakpoints,
            mock_file,
            commands,
        } => {
            let args = cli::debug::DebugArgs {
                source: &source,
                input: &input,
                breakpoints: &breakpoints,
                mock_file: mock_file.as_deref(),
                commands: &commands,
            };
            cli::debug::handle_debug(&state, args, json).await
        }

        Commands::Init {
            name,
            template,
            dir,
            force,
        } => {
            let args = cli::init::InitArgs {
                name: &name,
                template: &template,
                dir: dir.as_deref(),
                force,
            };
            cli::init::handle_init(&state, args, json).await
        }

        Commands::Templates => cli::init::handle_templates(json),

        Commands::Schema => cli::schema::handle_schema(),

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.serve_host.clone());
            let port = port.unwrap_or(state.config.serve_port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} workflow-cli API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());
            tracing::info!(%addr, "API server started");

            let ttl = std::time::Duration::from_secs(state.config.session_ttl_secs);
            let eviction = state.sessions.spawn_eviction(ttl);
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            eviction.abort();

            println!("\n  Server stopped.");
            Ok(ExitCode::SUCCESS)
        }

        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
