//! Application state shared by CLI commands and REST API handlers.

use workflow_core::workflow::session_store::DebugSessionStore;
use workflow_infra::config::{apply_overrides, load_cli_config};
use workflow_infra::filesystem::{FsWorkflowLoader, resolve_config_dir};
use workflow_infra::gateway::GatewayClient;
use workflow_types::config::CliConfig;

/// Shared application state.
///
/// Cheap to clone: the session store is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: CliConfig,
    pub loader: FsWorkflowLoader,
    pub sessions: DebugSessionStore,
}

impl AppState {
    /// Load `config.toml` and apply command-line overrides.
    pub async fn init(gateway_url: Option<&str>, namespace: Option<&str>) -> Self {
        let config_dir = resolve_config_dir();
        let mut config = load_cli_config(&config_dir).await;
        apply_overrides(&mut config, gateway_url, namespace);

        tracing::debug!(
            config_dir = %config_dir.display(),
            gateway = %config.gateway_url,
            namespace = %config.namespace,
            "configuration loaded"
        );

        Self::new(config)
    }

    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            loader: FsWorkflowLoader::new(),
            sessions: DebugSessionStore::new(),
        }
    }

    pub fn gateway(&self) -> GatewayClient {
        GatewayClient::from_config(&self.config)
    }
}
