//! Shared domain types for workflow-cli.
//!
//! This crate contains the types passed between the analysis engine, the
//! loaders, the CLI and the HTTP API: workflow and task definitions, plans,
//! validation reports, debug session snapshots, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, schemars, uuid, chrono, thiserror.

pub mod config;
pub mod debug;
pub mod error;
pub mod execution;
pub mod plan;
pub mod validation;
pub mod workflow;
