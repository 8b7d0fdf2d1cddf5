//! HTTP client for the remote workflow Gateway.
//!
//! Two endpoints are used:
//! - `POST {base}/api/v1/workflows/{name}/execute` runs a deployed workflow.
//! - `POST {base}/api/v1/workflows/{name}/test` dry-runs it and returns the
//!   same `{valid, executionPlan}` shape the local planner produces.
//!
//! Both take `{"input": ...}` as the body and an optional `namespace` query
//! parameter.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use workflow_types::config::CliConfig;
use workflow_types::execution::{DryRunResponse, WorkflowRunResult};

const USER_AGENT: &str = concat!("workflow-cli/", env!("CARGO_PKG_VERSION"));

/// Errors talking to the Gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Thin reqwest wrapper around the Gateway API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(
            config.gateway_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn workflow_url(&self, name: &str, action: &str) -> String {
        format!("{}/api/v1/workflows/{}/{}", self.base_url, name, action)
    }

    /// Execute a deployed workflow.
    pub async fn execute_workflow(
        &self,
        name: &str,
        input: &Value,
        namespace: Option<&str>,
    ) -> Result<WorkflowRunResult, GatewayError> {
        self.post(&self.workflow_url(name, "execute"), input, namespace)
            .await
    }

    /// Dry-run a deployed workflow.
    pub async fn dry_run_workflow(
        &self,
        name: &str,
        input: &Value,
        namespace: Option<&str>,
    ) -> Result<DryRunResponse, GatewayError> {
        self.post(&self.workflow_url(name, "test"), input, namespace)
            .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        input: &Value,
        namespace: Option<&str>,
    ) -> Result<T, GatewayError> {
        debug!(%url, ?namespace, "calling gateway");

        let mut request = self.http.post(url).json(&json!({ "input": input }));
        if let Some(ns) = namespace {
            request = request.query(&[("namespace", ns)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "gateway returned error status");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
