//! CLI configuration types.
//!
//! `CliConfig` represents the `config.toml` in the workflow-cli config
//! directory. All fields have defaults so a missing file is not an error.

use serde::{Deserialize, Serialize};

/// Top-level configuration for `workflow-cli`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the workflow Gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Namespace used when a command does not specify one.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Directory searched for task definitions.
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: String,

    /// Gateway request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bind host for `workflow-cli serve`.
    #[serde(default = "default_serve_host")]
    pub serve_host: String,

    /// Bind port for `workflow-cli serve`.
    #[serde(default = "default_serve_port")]
    pub serve_port: u16,

    /// Seconds a finished debug session is kept by `serve` after its last use.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_namespace() -> String {
    crate::workflow::DEFAULT_NAMESPACE.to_string()
}

fn default_tasks_dir() -> String {
    "./tasks".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_serve_host() -> String {
    "127.0.0.1".to_string()
}

fn default_serve_port() -> u16 {
    3000
}

fn default_session_ttl_secs() -> u64 {
    900
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            namespace: default_namespace(),
            tasks_dir: default_tasks_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            serve_host: default_serve_host(),
            serve_port: default_serve_port(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}
