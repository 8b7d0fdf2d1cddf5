//! Analysis engine and ports for workflow-cli.
//!
//! This crate holds the pure graph/template analysis, the debug session
//! state machine, and the traits (`WorkflowLoader`, `TaskExecutor`) that the
//! infrastructure layer implements. It depends only on `workflow-types` --
//! never on `workflow-infra` or any network/filesystem crate.

pub mod workflow;
