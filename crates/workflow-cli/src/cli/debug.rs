//! `workflow-cli debug`: an interactive stepping debugger.
//!
//! Commands are read from a `debug>` prompt, or taken from `--exec` flags
//! for scripted use. Tasks run through the mock executor, so a debug session
//! never calls real endpoints.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use dialoguer::Input;
use serde_json::{Value, json};
use workflow_core::workflow::debug::{DebugSession, SessionError};
use workflow_core::workflow::executor::{BoxTaskExecutor, MockExecutor};
use workflow_types::debug::{SessionSnapshot, SessionState, TaskStatus};

use super::input::{load_input, load_mock_file, load_workflow};
use super::render::{format_path, print_json};
use super::{InputArgs, SourceArgs};
use crate::state::AppState;

/// A parsed debugger command.
#[derive(Debug, PartialEq)]
pub enum DebugCommand {
    Start,
    Step,
    Continue,
    Stop,
    Break(String),
    Unbreak(String),
    Enable(String),
    Disable(String),
    /// Print the whole context, or the value under a dotted path.
    Context(Option<String>),
    Set { path: String, value: Value },
    Mock { task_ref: String, response: Value },
    Unmock(String),
    Status,
    Help,
    Quit,
    Empty,
    /// Unrecognized or malformed input, with a message for the user.
    Unknown(String),
}

/// Parse one line of debugger input.
pub fn parse(input: &str) -> DebugCommand {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return DebugCommand::Empty;
    }

    let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let required = |name: &str, what: &str| -> Result<String, DebugCommand> {
        if rest.is_empty() {
            Err(DebugCommand::Unknown(format!("{name} requires a {what}")))
        } else {
            Ok(rest.to_string())
        }
    };

    let result = match cmd.as_str() {
        "start" | "run" | "r" => Ok(DebugCommand::Start),
        "step" | "s" | "n" => Ok(DebugCommand::Step),
        "continue" | "c" => Ok(DebugCommand::Continue),
        "stop" => Ok(DebugCommand::Stop),
        "break" | "b" => required("break", "task id").map(DebugCommand::Break),
        "unbreak" | "delete" => required("unbreak", "task id").map(DebugCommand::Unbreak),
        "enable" => required("enable", "task id").map(DebugCommand::Enable),
        "disable" => required("disable", "task id").map(DebugCommand::Disable),
        "context" | "ctx" | "p" => Ok(DebugCommand::Context(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "set" => parse_key_json("set", "<path> <json>", rest)
            .map(|(path, value)| DebugCommand::Set { path, value }),
        "mock" => parse_key_json("mock", "<taskRef> <json>", rest)
            .map(|(task_ref, response)| DebugCommand::Mock { task_ref, response }),
        "unmock" => required("unmock", "task ref").map(DebugCommand::Unmock),
        "status" | "st" => Ok(DebugCommand::Status),
        "help" | "h" | "?" => Ok(DebugCommand::Help),
        "quit" | "exit" | "q" => Ok(DebugCommand::Quit),
        other => Err(DebugCommand::Unknown(format!("unknown command '{other}'"))),
    };

    result.unwrap_or_else(|unknown| unknown)
}

fn parse_key_json(name: &str, usage: &str, rest: &str) -> Result<(String, Value), DebugCommand> {
    let usage_error = || DebugCommand::Unknown(format!("usage: {name} {usage}"));
    let (key, raw) = rest.split_once(char::is_whitespace).ok_or_else(usage_error)?;
    let value = serde_json::from_str(raw.trim())
        .map_err(|e| DebugCommand::Unknown(format!("{name}: invalid JSON value: {e}")))?;
    Ok((key.to_string(), value))
}

pub struct DebugArgs<'a> {
    pub source: &'a SourceArgs,
    pub input: &'a InputArgs,
    pub breakpoints: &'a [String],
    pub mock_file: Option<&'a std::path::Path>,
    pub commands: &'a [String],
}

pub async fn handle_debug(state: &AppState, args: DebugArgs<'_>, json: bool) -> Result<ExitCode> {
    let loaded = load_workflow(state, args.source).await?;
    let input = load_input(args.input).await?;
    let responses = match args.mock_file {
        Some(path) => load_mock_file(path).await?,
        None => json!({}),
    };
    let executor = Arc::new(BoxTaskExecutor::new(MockExecutor::from_responses(&responses)));
    let tasks = loaded.tasks.clone().unwrap_or_default();

    let mut session = DebugSession::create(loaded.workflow, tasks, input, executor)?;
    for task_id in args.breakpoints {
        session.add_breakpoint(task_id);
    }

    if !json {
        println!();
        println!(
            "  Debugging {} {}",
            style(&session.workflow().name).cyan().bold(),
            style(format!("(session {})", session.id())).dim()
        );
        println!(
            "  Order: {}",
            format_path(&session.snapshot().execution_order)
        );
        println!(
            "  {}",
            style("Type 'help' for commands, 'quit' to leave.").dim()
        );
        println!();
    }

    if args.commands.is_empty() {
        loop {
            let line: String = match Input::new()
                .with_prompt("debug")
                .allow_empty(true)
                .interact_text()
            {
                Ok(line) => line,
                // Ctrl+D / closed stdin ends the session.
                Err(_) => break,
            };
            if !execute(&mut session, parse(&line), json).await? {
                break;
            }
        }
    } else {
        for line in args.commands {
            if !json {
                println!("{} {}", style("debug>").dim(), line);
            }
            if !execute(&mut session, parse(line), json).await? {
                break;
            }
        }
    }

    let final_state = session.state();
    tracing::info!(session_id = %session.id(), state = %final_state, "debug session ended");

    Ok(if final_state == SessionState::Failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Apply one command to the session. Returns `false` when the user quits.
async fn execute(session: &mut DebugSession, command: DebugCommand, json: bool) -> Result<bool> {
    let outcome: Result<SessionSnapshot, SessionError> = match command {
        DebugCommand::Empty => return Ok(true),
        DebugCommand::Quit => return Ok(false),
        DebugCommand::Help => {
            print_help();
            return Ok(true);
        }
        DebugCommand::Unknown(message) => {
            eprintln!("  {} {}", style("?").yellow(), message);
            return Ok(true);
        }
        DebugCommand::Context(path) => {
            print_context(&session.snapshot(), path.as_deref())?;
            return Ok(true);
        }
        DebugCommand::Status => Ok(session.snapshot()),
        DebugCommand::Start => session.start().await,
        DebugCommand::Step => session.step().await,
        DebugCommand::Continue => session.continue_run().await,
        DebugCommand::Stop => session.stop(),
        DebugCommand::Break(task_id) => Ok(session.add_breakpoint(&task_id)),
        DebugCommand::Unbreak(task_id) => session.remove_breakpoint(&task_id),
        DebugCommand::Enable(task_id) => session.set_breakpoint_enabled(&task_id, true),
        DebugCommand::Disable(task_id) => session.set_breakpoint_enabled(&task_id, false),
        DebugCommand::Set { path, value } => session.set_context_value(&path, value),
        DebugCommand::Mock { task_ref, response } => Ok(session.set_mock_response(&task_ref, response)),
        DebugCommand::Unmock(task_ref) => Ok(session.clear_mock_response(&task_ref)),
    };

    match outcome {
        Ok(snapshot) => {
            if json {
                print_json(&snapshot)?;
            } else {
                print_snapshot(&snapshot);
            }
        }
        Err(e) => {
            if json {
                print_json(&json!({ "error": e.to_string() }))?;
            } else {
                eprintln!("  {} {}", style("✗").red(), e);
            }
        }
    }
    Ok(true)
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    let state = match snapshot.state {
        SessionState::Completed => style(snapshot.state.to_string()).green().bold(),
        SessionState::Failed => style(snapshot.state.to_string()).red().bold(),
        SessionState::Paused => style(snapshot.state.to_string()).yellow().bold(),
        _ => style(snapshot.state.to_string()).cyan().bold(),
    };
    println!(
        "  [{state}] {}/{} tasks done{}",
        snapshot.current_index,
        snapshot.execution_order.len(),
        snapshot
            .current_task
            .as_ref()
            .map(|t| format!(", next: {}", style(t).cyan()))
            .unwrap_or_default()
    );

    if let Some(last) = snapshot.history.last() {
        let mark = match last.status {
            TaskStatus::Success => style("✓").green(),
            TaskStatus::Failed => style("✗").red(),
            TaskStatus::Pending | TaskStatus::Skipped => style("○").yellow(),
        };
        println!(
            "  {mark} last: {} ({}) {}ms",
            last.task_id, last.task_ref, last.duration_ms
        );
    }

    if !snapshot.breakpoints.is_empty() {
        let breakpoints = snapshot
            .breakpoints
            .iter()
            .map(|(id, bp)| {
                let flag = if bp.enabled { "" } else { " (off)" };
                format!("{id}{flag} x{}", bp.hit_count)
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} {}", style("breakpoints:").dim(), breakpoints);
    }

    if !snapshot.mocked_task_refs.is_empty() {
        println!(
            "  {} {}",
            style("mocks:").dim(),
            snapshot.mocked_task_refs.join(", ")
        );
    }

    if let Some(error) = &snapshot.error {
        println!("  {} {}", style("error:").red().bold(), error);
    }
}

fn print_context(snapshot: &SessionSnapshot, path: Option<&str>) -> Result<()> {
    let context = serde_json::to_value(&snapshot.context)?;
    let value = match path {
        None => Some(&context),
        Some(path) => path
            .split('.')
            .try_fold(&context, |node, segment| node.get(segment)),
    };
    match value {
        Some(value) => {
            for line in serde_json::to_string_pretty(value)?.lines() {
                println!("  {line}");
            }
        }
        None => eprintln!(
            "  {} nothing at '{}'",
            style("?").yellow(),
            path.unwrap_or_default()
        ),
    }
    Ok(())
}

fn print_help() {
    let rows = [
        ("start", "Run until a breakpoint, a failure or the end"),
        ("step", "Execute the next task and pause"),
        ("continue", "Resume from a pause"),
        ("stop", "Stop the session"),
        ("break <task>", "Add a breakpoint"),
        ("unbreak <task>", "Remove a breakpoint"),
        ("enable <task>", "Enable a breakpoint"),
        ("disable <task>", "Disable a breakpoint"),
        ("context [path]", "Show the execution context"),
        ("set <path> <json>", "Overwrite a context value"),
        ("mock <ref> <json>", "Canned response for a taskRef"),
        ("unmock <ref>", "Remove a canned response"),
        ("status", "Show the session state"),
        ("quit", "Leave the debugger"),
    ];
    println!();
    println!("  {}", style("Debugger commands:").bold());
    println!();
    for (command, description) in rows {
        println!("  {:<20} {}", style(command).cyan(), description);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execution_commands() {
        assert_eq!(parse("start"), DebugCommand::Start);
        assert_eq!(parse("  STEP "), DebugCommand::Step);
        assert_eq!(parse("s"), DebugCommand::Step);
        assert_eq!(parse("c"), DebugCommand::Continue);
        assert_eq!(parse("stop"), DebugCommand::Stop);
        assert_eq!(parse("q"), DebugCommand::Quit);
        assert_eq!(parse(""), DebugCommand::Empty);
    }

    #[test]
    fn test_parse_breakpoints() {
        assert_eq!(parse("break fetch-user"), DebugCommand::Break("fetch-user".into()));
        assert_eq!(parse("disable a"), DebugCommand::Disable("a".into()));
        assert!(matches!(parse("break"), DebugCommand::Unknown(m) if m.contains("task id")));
    }

    #[test]
    fn test_parse_set_with_json_value() {
        assert_eq!(
            parse(r#"set input.user {"id": 7}"#),
            DebugCommand::Set {
                path: "input.user".into(),
                value: json!({ "id": 7 }),
            }
        );
        assert_eq!(
            parse("mock http-get 42"),
            DebugCommand::Mock {
                task_ref: "http-get".into(),
                response: json!(42),
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(parse("set input.x"), DebugCommand::Unknown(m) if m.contains("usage")));
        assert!(matches!(parse("set input.x {nope"), DebugCommand::Unknown(m) if m.contains("invalid JSON")));
        assert!(matches!(parse("frobnicate"), DebugCommand::Unknown(m) if m.contains("frobnicate")));
    }

    #[test]
    fn test_parse_context_path_is_optional() {
        assert_eq!(parse("context"), DebugCommand::Context(None));
        assert_eq!(parse("ctx tasks.a.output"), DebugCommand::Context(Some("tasks.a.output".into())));
    }

    #[tokio::test]
    async fn test_scripted_commands_drive_session() {
        use workflow_types::workflow::{TaskNode, WorkflowDefinition};

        let workflow = WorkflowDefinition {
            name: "wf".into(),
            namespace: "default".into(),
            description: None,
            input: None,
            tasks: vec![TaskNode::new("a", "ref-a", &[]), TaskNode::new("b", "ref-b", &["a"])],
            output: Default::default(),
        };
        let executor = Arc::new(BoxTaskExecutor::new(MockExecutor::new()));
        let mut session = DebugSession::create(workflow, vec![], json!({}), executor).unwrap();

        for line in ["break b", "start", "context tasks.a", "continue"] {
            assert!(execute(&mut session, parse(line), true).await.unwrap());
        }
        assert_eq!(session.state(), SessionState::Completed);
        assert!(!execute(&mut session, parse("quit"), true).await.unwrap());
    }
}
