//! Indexer Gateway Client Module
//!
//! HTTP client for the indexer gateway that fronts the per-domain subgraphs.
//! The gateway exposes JSON endpoints for block heights, origin- and
//! destination-side transfer queries, targeted nonce lookups, and the
//! finalization mode reported by the hub root manager and each spoke
//! connector.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::{AgentMode, Domain, Transfer};

// ============================================================================
// REQUEST/RESPONSE STRUCTURES
// ============================================================================

/// One origin-side transfer query within a batched gateway request.
#[derive(Debug, Clone, Serialize)]
pub struct OriginTransferQuery {
    /// Origin domain to query
    pub origin_domain: Domain,
    /// Inclusive lower nonce bound
    pub from_nonce: u64,
    /// Inclusive upper block bound, the confirmation-adjusted query window
    pub max_block_number: u64,
    /// Destination domains this agent is configured for
    pub destination_domains: Vec<Domain>,
}

#[derive(Debug, Serialize)]
struct BlockNumberRequest<'a> {
    domains: &'a [Domain],
}

#[derive(Debug, Deserialize)]
struct BlockNumberResponse {
    block_numbers: HashMap<Domain, u64>,
}

#[derive(Debug, Serialize)]
struct OriginTransferRequest<'a> {
    queries: &'a [OriginTransferQuery],
}

/// Origin-side transfer query result.
#[derive(Debug, Deserialize)]
pub struct OriginTransferResponse {
    /// Transfers matching the queries, across all queried domains
    pub transfers: Vec<Transfer>,
    /// Highest nonce the indexer has seen per queried domain, independent
    /// of the query window
    #[serde(default)]
    pub latest_nonces: HashMap<Domain, u64>,
}

#[derive(Debug, Serialize)]
struct TransfersByNoncesRequest<'a> {
    origin_domain: &'a Domain,
    nonces: &'a [u64],
}

#[derive(Debug, Deserialize)]
struct TransfersResponse {
    transfers: Vec<Transfer>,
}

#[derive(Debug, Serialize)]
struct DestinationTransferRequest<'a> {
    transfer_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ModeResponse {
    mode: AgentMode,
}

// ============================================================================
// CLIENT
// ============================================================================

/// Client for the indexer gateway.
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    client: Client,
    base_url: String,
}

impl SubgraphClient {
    /// Creates a new gateway client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the indexer gateway
    /// * `timeout_ms` - Timeout applied to every request
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .no_proxy()
            .build()
            .context("Failed to build indexer gateway HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Latest indexed block number per domain.
    ///
    /// Domains the indexer has no height for are absent from the returned
    /// map; callers skip those domains for the cycle.
    pub async fn latest_block_numbers(&self, domains: &[Domain]) -> Result<HashMap<Domain, u64>> {
        let url = format!("{}/block-numbers", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&BlockNumberRequest { domains })
            .send()
            .await
            .context("Failed to query latest block numbers")?
            .error_for_status()
            .context("Indexer gateway rejected block number query")?;

        let parsed: BlockNumberResponse = response
            .json()
            .await
            .context("Failed to parse block number response")?;
        Ok(parsed.block_numbers)
    }

    /// Batched origin-side transfer query.
    ///
    /// Returns finalized transfers matching the per-domain windows together
    /// with the indexer's latest-nonce frontier for each queried domain.
    pub async fn origin_transfers(
        &self,
        queries: &[OriginTransferQuery],
    ) -> Result<OriginTransferResponse> {
        let url = format!("{}/origin-transfers", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&OriginTransferRequest { queries })
            .send()
            .await
            .context("Failed to query origin transfers")?
            .error_for_status()
            .context("Indexer gateway rejected origin transfer query")?;

        response
            .json()
            .await
            .context("Failed to parse origin transfer response")
    }

    /// Targeted origin-side lookup of specific nonces on one domain.
    pub async fn transfers_by_nonces(
        &self,
        origin_domain: &Domain,
        nonces: &[u64],
    ) -> Result<Vec<Transfer>> {
        let url = format!("{}/transfers-by-nonces", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TransfersByNoncesRequest {
                origin_domain,
                nonces,
            })
            .send()
            .await
            .context("Failed to query transfers by nonce")?
            .error_for_status()
            .context("Indexer gateway rejected nonce query")?;

        let parsed: TransfersResponse = response
            .json()
            .await
            .context("Failed to parse nonce query response")?;
        Ok(parsed.transfers)
    }

    /// Destination-side records for a set of transfer ids.
    pub async fn destination_transfers(&self, transfer_ids: &[String]) -> Result<Vec<Transfer>> {
        let url = format!("{}/destination-transfers", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&DestinationTransferRequest { transfer_ids })
            .send()
            .await
            .context("Failed to query destination transfers")?
            .error_for_status()
            .context("Indexer gateway rejected destination transfer query")?;

        let parsed: TransfersResponse = response
            .json()
            .await
            .context("Failed to parse destination transfer response")?;
        Ok(parsed.transfers)
    }

    /// Finalization mode reported by the hub's root manager.
    pub async fn root_manager_mode(&self, hub_domain: &Domain) -> Result<AgentMode> {
        let url = format!("{}/root-manager-mode/{}", self.base_url, hub_domain);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query root manager mode")?
            .error_for_status()
            .context("Indexer gateway rejected root manager mode query")?;

        let parsed: ModeResponse = response
            .json()
            .await
            .context("Failed to parse root manager mode response")?;
        Ok(parsed.mode)
    }

    /// Finalization mode reported by a spoke connector.
    pub async fn spoke_connector_mode(&self, domain: &Domain) -> Result<AgentMode> {
        let url = format!("{}/spoke-connector-mode/{}", self.base_url, domain);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query spoke connector mode")?
            .error_for_status()
            .context("Indexer gateway rejected spoke connector mode query")?;

        let parsed: ModeResponse = response
            .json()
            .await
            .context("Failed to parse spoke connector mode response")?;
        Ok(parsed.mode)
    }
}
