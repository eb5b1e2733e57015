//! Broker Queue Client Module
//!
//! Publishes broker messages onto the channel the proof-generation stage
//! consumes from. The broker exposes a JSON publish endpoint; delivery
//! semantics beyond the accepted/rejected response are the broker's
//! concern.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::types::BrokerMessage;

/// Client for the outbound broker queue.
#[derive(Debug, Clone)]
pub struct QueueClient {
    client: Client,
    base_url: String,
    channel: String,
}

impl QueueClient {
    /// Creates a queue client bound to one channel.
    pub fn new(base_url: &str, channel: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .no_proxy()
            .build()
            .context("Failed to build queue HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel: channel.to_string(),
        })
    }

    /// Publishes one broker message onto the configured channel.
    pub async fn publish(&self, message: &BrokerMessage) -> Result<()> {
        let url = format!("{}/publish", self.base_url);
        self.client
            .post(&url)
            .json(&json!({
                "channel": self.channel,
                "message": message,
            }))
            .send()
            .await
            .context("Failed to publish broker message")?
            .error_for_status()
            .context("Queue broker rejected the message")?;

        debug!(
            "Published broker message for pair {} -> {} with {} transfers",
            message.origin_domain,
            message.destination_domain,
            message.messages.len()
        );
        Ok(())
    }
}
