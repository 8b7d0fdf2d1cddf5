//! Infrastructure layer for workflow-cli.
//!
//! Contains the implementations behind the traits defined in `workflow-core`:
//! filesystem definition loading, project scaffolding, `config.toml`
//! handling and the HTTP client for the remote workflow Gateway.

pub mod config;
pub mod filesystem;
pub mod gateway;
