//! Configuration Management Module
//!
//! Loads and validates configuration for the courier agent: the configured
//! domain set with per-domain chain endpoints and contract deployments, the
//! indexer gateway, the outbound queue, relayer backends, and loop timing
//! settings.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::Domain;

/// Confirmation depth applied when a domain does not configure its own.
pub const DEFAULT_SAFE_CONFIRMATIONS: u64 = 5;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Domain id of the hub (aggregating) domain; must appear in `domains`
    pub hub_domain: Domain,
    /// All configured domains, keyed by domain id
    pub domains: HashMap<Domain, DomainConfig>,
    /// Indexer gateway configuration
    pub indexer: IndexerConfig,
    /// Outbound broker-message queue configuration
    pub queue: QueueConfig,
    /// Relayer backends, tried in configured priority order
    pub relayers: Vec<RelayerConfig>,
    /// Loop timing settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Optional heartbeat URLs, hit on fully successful runs
    #[serde(default)]
    pub health: HealthConfig,
}

/// Configuration for one bridge domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Chain id used for on-chain reads and relayer submissions
    pub chain_id: u64,
    /// JSON-RPC endpoint for on-chain reads
    pub rpc_url: String,
    /// Confirmation depth subtracted from the latest block when computing
    /// the ingestion query window
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Lower bound applied to the nonce cursor on this domain
    #[serde(default)]
    pub start_nonce: Option<u64>,
    /// Deployed contract addresses on this domain
    pub deployments: DeploymentsConfig,
}

/// Contract deployments this agent dispatches against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentsConfig {
    /// Spoke connector, target of finalize submissions
    pub spoke_connector: String,
    /// Merkle tree manager, read for processed-leaf counts
    pub merkle_tree: String,
    /// Root manager, target of hub propose submissions (hub domain only)
    #[serde(default)]
    pub root_manager: Option<String>,
}

/// Indexer gateway connection details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Base URL of the indexer gateway
    pub url: String,
}

/// Outbound queue connection details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Base URL of the queue broker
    pub url: String,
    /// Channel broker messages are published onto
    pub channel: String,
}

/// Relayer backend type, selected at configuration load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayerKind {
    /// The bridge's own relayer service
    Native,
    /// Gelato-style sponsored-call relayer
    Gelato,
}

/// One relayer backend entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Backend type
    pub kind: RelayerKind,
    /// Base URL of the backend
    pub url: String,
    /// API key, required by some backends
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Loop timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Interval between ingestion and backfill cycles in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Interval between publish cycles in milliseconds
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
    /// Interval between propose/finalize cycles in milliseconds
    #[serde(default = "default_propose_interval_ms")]
    pub propose_interval_ms: u64,
    /// Minimum elapsed seconds between batches for one origin/destination
    /// pair
    #[serde(default = "default_batch_interval_secs")]
    pub batch_interval_secs: u64,
    /// Upper bound on missing nonces re-queried per domain per backfill
    /// cycle
    #[serde(default = "default_gap_page_size")]
    pub gap_page_size: usize,
    /// Upper bound on pending transfers selected per pair per publish cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Timeout applied to every outbound HTTP request in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Heartbeat endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Hit with a GET after a propose run completes without failures
    #[serde(default)]
    pub propose_url: Option<String>,
}

fn default_confirmations() -> u64 {
    DEFAULT_SAFE_CONFIRMATIONS
}

fn default_polling_interval_ms() -> u64 {
    15_000
}

fn default_publish_interval_ms() -> u64 {
    30_000
}

fn default_propose_interval_ms() -> u64 {
    60_000
}

fn default_batch_interval_secs() -> u64 {
    300
}

fn default_gap_page_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    100
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
            publish_interval_ms: default_publish_interval_ms(),
            propose_interval_ms: default_propose_interval_ms(),
            batch_interval_secs: default_batch_interval_secs(),
            gap_page_size: default_gap_page_size(),
            batch_size: default_batch_size(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND VALIDATION
// ============================================================================

impl Config {
    /// Loads configuration from the TOML file.
    ///
    /// The path defaults to `config/courier.toml` and can be overridden via
    /// the `COURIER_CONFIG_PATH` environment variable (set by the `--config`
    /// CLI flag).
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, parse failure, or validation
    ///   failure
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("COURIER_CONFIG_PATH")
            .unwrap_or_else(|_| "config/courier.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/courier.template.toml config/courier.toml\n\
                Then edit config/courier.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Validates the configuration.
    ///
    /// Checks that the hub domain is configured, domain ids are numeric,
    /// chain ids are unique, every URL parses, at least one relayer backend
    /// is configured, and the hub carries a root manager deployment.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.domains.contains_key(&self.hub_domain) {
            anyhow::bail!(
                "Configuration error: hub domain {} is not present in the configured domain set",
                self.hub_domain
            );
        }

        let mut seen_chain_ids = HashSet::new();
        for (domain, domain_config) in &self.domains {
            domain.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("Configuration error: domain id {} is not numeric", domain)
            })?;
            if !seen_chain_ids.insert(domain_config.chain_id) {
                anyhow::bail!(
                    "Configuration error: chain id {} is configured for more than one domain. \
                    Each domain must have a unique chain id.",
                    domain_config.chain_id
                );
            }
            validate_url(&domain_config.rpc_url)
                .map_err(|e| anyhow::anyhow!("Invalid rpc_url for domain {}: {}", domain, e))?;
        }

        let hub = &self.domains[&self.hub_domain];
        if hub.deployments.root_manager.is_none() {
            anyhow::bail!(
                "Configuration error: hub domain {} has no root_manager deployment",
                self.hub_domain
            );
        }

        validate_url(&self.indexer.url)
            .map_err(|e| anyhow::anyhow!("Invalid indexer url: {}", e))?;
        validate_url(&self.queue.url).map_err(|e| anyhow::anyhow!("Invalid queue url: {}", e))?;

        if self.relayers.is_empty() {
            anyhow::bail!("Configuration error: at least one relayer backend must be configured");
        }
        for relayer in &self.relayers {
            validate_url(&relayer.url)
                .map_err(|e| anyhow::anyhow!("Invalid relayer url {}: {}", relayer.url, e))?;
        }

        if let Some(ref propose_url) = self.health.propose_url {
            validate_url(propose_url)
                .map_err(|e| anyhow::anyhow!("Invalid health propose url: {}", e))?;
        }

        Ok(())
    }
}

/// Checks that a URL string parses as an absolute URL.
fn validate_url(raw: &str) -> anyhow::Result<()> {
    Url::parse(raw).map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(())
}
