//! CLI configuration loader.
//!
//! Reads `config.toml` from the config directory (`~/.config/workflow-cli/`
//! on Linux) and deserializes it into [`CliConfig`]. Falls back to defaults
//! when the file is missing or malformed.

use std::path::Path;

use workflow_types::config::CliConfig;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Load configuration from `{config_dir}/config.toml`.
///
/// - If the file does not exist, returns [`CliConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_cli_config(config_dir: &Path) -> CliConfig {
    let config_path = config_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return CliConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return CliConfig::default();
        }
    };

    match toml::from_str::<CliConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            CliConfig::default()
        }
    }
}

/// Apply command-line overrides (flags or their env vars) on top of the file.
pub fn apply_overrides(config: &mut CliConfig, gateway_url: Option<&str>, namespace: Option<&str>) {
    if let Some(url) = gateway_url.filter(|u| !u.trim().is_empty()) {
        config.gateway_url = url.trim_end_matches('/').to_string();
    }
    if let Some(ns) = namespace.filter(|n| !n.trim().is_empty()) {
        config.namespace = ns.to_string();
    }
}
