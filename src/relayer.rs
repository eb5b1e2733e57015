//! Relayer Client Module
//!
//! Submits encoded contract calls through external relayer backends. Two
//! backend flavors are supported: the bridge's own relayer service and a
//! Gelato-style sponsored-call endpoint. Backends are tried in configured
//! priority order; a submission is successful as soon as one backend
//! accepts it.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::{RelayerConfig, RelayerKind};
use crate::error::AgentError;

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(rename = "taskId")]
    task_id: String,
}

/// Client for one relayer backend.
#[derive(Debug, Clone)]
pub struct RelayerClient {
    client: Client,
    kind: RelayerKind,
    base_url: String,
    api_key: Option<String>,
}

impl RelayerClient {
    /// Creates a client for one configured backend.
    pub fn new(config: &RelayerConfig, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .no_proxy()
            .build()
            .context("Failed to build relayer HTTP client")?;

        Ok(Self {
            client,
            kind: config.kind,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Backend type of this client.
    pub fn kind(&self) -> RelayerKind {
        self.kind
    }

    /// Submits an encoded call to this backend.
    ///
    /// # Arguments
    ///
    /// * `chain_id` - Chain the transaction targets
    /// * `to` - Target contract address
    /// * `data` - ABI-encoded calldata, 0x-prefixed
    ///
    /// # Returns
    ///
    /// The backend's task id for the accepted submission.
    pub async fn send(&self, chain_id: u64, to: &str, data: &str) -> Result<String> {
        let (url, body) = match self.kind {
            RelayerKind::Native => (
                format!("{}/relays/{}", self.base_url, chain_id),
                json!({
                    "to": to,
                    "data": data,
                    "apiKey": self.api_key,
                }),
            ),
            RelayerKind::Gelato => (
                format!("{}/relays/v2/sponsored-call", self.base_url),
                json!({
                    "chainId": chain_id,
                    "target": to,
                    "data": data,
                    "sponsorApiKey": self.api_key,
                }),
            ),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Relay submission to {} failed", self.base_url))?
            .error_for_status()
            .with_context(|| format!("Relayer {} rejected the submission", self.base_url))?;

        let parsed: RelayResponse = response
            .json()
            .await
            .context("Failed to parse relayer response")?;
        Ok(parsed.task_id)
    }
}

/// Submits through the backends in priority order, falling back on failure.
///
/// Each rejection is logged and the next backend is tried. Only when every
/// backend has rejected the submission does the call fail, with
/// [`AgentError::RelaySubmissionExhausted`].
pub async fn send_with_backup(
    relayers: &[RelayerClient],
    chain_id: u64,
    to: &str,
    data: &str,
) -> Result<String> {
    for relayer in relayers {
        match relayer.send(chain_id, to, data).await {
            Ok(task_id) => {
                info!(
                    "Relay submission accepted by {:?} backend: task {}",
                    relayer.kind(),
                    task_id
                );
                return Ok(task_id);
            }
            Err(e) => {
                warn!(
                    "Relay submission via {:?} backend failed, trying next: {:#}",
                    relayer.kind(),
                    e
                );
            }
        }
    }
    Err(AgentError::RelaySubmissionExhausted {
        attempts: relayers.len(),
    }
    .into())
}
