//! Observability setup for workflow-cli.

pub mod tracing_setup;
