//! HTTP client for the environment provisioning service.
//!
//! One pooled `reqwest::Client` is built up front and shared by every
//! call; clones of [`ProvisionerClient`] share that pool.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::EnvironmentProvisioner;
use super::types::{DeprovisionRequest, ProvisionRequest, ProvisionResult};

/// Longest slice of an error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

/// Provisioner call failures. The orchestrator treats every variant
/// uniformly as a failed provision.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provisioner did not respond within {0:?}")]
    Timeout(Duration),

    #[error("provisioner returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed provisioner response: {0}")]
    MalformedBody(String),
}

/// Stateless adapter over the provisioner's HTTP API.
#[derive(Debug, Clone)]
pub struct ProvisionerClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ProvisionerClient {
    /// Create a client with its own connection pool.
    pub fn new(endpoint: &str) -> Result<Self, ProvisionError> {
        // reqwest is built with `rustls-no-provider`; an `Err` here only means
        // a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().build()?;
        Self::with_http_client(http, endpoint)
    }

    /// Create a client on top of an existing pool.
    pub fn with_http_client(http: reqwest::Client, endpoint: &str) -> Result<Self, ProvisionError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(ProvisionError::Config("provisioner endpoint is empty".into()));
        }
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| ProvisionError::Config(format!("invalid provisioner endpoint: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ProvisionError::Config(format!(
                "unsupported provisioner scheme: {}",
                endpoint.scheme()
            )));
        }
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Teardown route, `{endpoint}/delete`.
    pub(crate) fn delete_url(&self) -> String {
        format!("{}/delete", self.endpoint.as_str().trim_end_matches('/'))
    }

    /// POST a JSON body and return the raw response body on 2xx.
    async fn post_json<T: Serialize + Sync>(
        &self,
        url: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<Vec<u8>, ProvisionError> {
        let call = async {
            let resp = self.http.post(url).json(body).send().await?;
            let status = resp.status();
            let bytes = resp.bytes().await?;
            if !status.is_success() {
                let text = String::from_utf8_lossy(&bytes);
                let message = if text.trim().is_empty() {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                } else {
                    text.chars().take(MAX_ERROR_BODY).collect()
                };
                return Err(ProvisionError::Status {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(bytes.to_vec())
        };

        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ProvisionError::Timeout(timeout))?
    }

    fn parse_result(body: &[u8]) -> Result<ProvisionResult, ProvisionError> {
        let result: ProvisionResult = serde_json::from_slice(body)
            .map_err(|e| ProvisionError::MalformedBody(e.to_string()))?;
        if result.base_url.trim().is_empty() {
            return Err(ProvisionError::MalformedBody("baseURL is empty".into()));
        }
        Ok(result)
    }
}

impl EnvironmentProvisioner for ProvisionerClient {
    async fn provision(
        &self,
        req: &ProvisionRequest,
        timeout: Duration,
    ) -> Result<ProvisionResult, ProvisionError> {
        debug!(
            assignment = %req.assignment_name,
            course = %req.course_name,
            participants = req.net_ids.len(),
            "Requesting environment"
        );
        let body = self
            .post_json(self.endpoint.as_str(), req, timeout)
            .await
            .inspect_err(|e| warn!(assignment = %req.assignment_name, error = %e, "Provision call failed"))?;
        Self::parse_result(&body)
    }

    async fn deprovision(
        &self,
        req: &DeprovisionRequest,
        timeout: Duration,
    ) -> Result<(), ProvisionError> {
        debug!(
            assignment = %req.assignment_name,
            course = %req.course_name,
            net_id = %req.net_id,
            "Tearing down environment"
        );
        self.post_json(&self.delete_url(), req, timeout)
            .await
            .map(|_| ())
    }
}
