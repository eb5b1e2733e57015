//! Agent Context Module
//!
//! The explicit dependency bundle every task function takes as its first
//! argument: configuration, the shared store, and the outbound clients.
//! Nothing in the agent reaches for global state; tests build a context
//! against mock servers and call the task functions directly.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::chain::ChainReader;
use crate::config::Config;
use crate::queue::QueueClient;
use crate::relayer::RelayerClient;
use crate::store::AgentStore;
use crate::subgraph::SubgraphClient;
use crate::tasks::publisher::PublishLock;
use crate::types::Domain;

/// Shared dependencies handed to every task.
#[derive(Clone)]
pub struct AgentContext {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Shared in-memory state store
    pub store: Arc<AgentStore>,
    /// Indexer gateway client
    pub subgraph: SubgraphClient,
    /// Read-only chain client
    pub chain: ChainReader,
    /// Relayer backends in priority order
    pub relayers: Arc<Vec<RelayerClient>>,
    /// Outbound broker queue client
    pub queue: QueueClient,
    /// Process-wide publish cycle lock
    pub publish_lock: Arc<PublishLock>,
}

impl AgentContext {
    /// Builds the context from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        let timeout_ms = config.agent.request_timeout_ms;

        let subgraph = SubgraphClient::new(&config.indexer.url, timeout_ms)?;

        let rpc_urls: HashMap<u64, String> = config
            .domains
            .values()
            .map(|d| (d.chain_id, d.rpc_url.clone()))
            .collect();
        let chain = ChainReader::new(rpc_urls, timeout_ms)?;

        let relayers = config
            .relayers
            .iter()
            .map(|r| RelayerClient::new(r, timeout_ms))
            .collect::<Result<Vec<_>>>()
            .context("Failed to build relayer clients")?;

        let queue = QueueClient::new(&config.queue.url, &config.queue.channel, timeout_ms)?;

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(AgentStore::new()),
            subgraph,
            chain,
            relayers: Arc::new(relayers),
            queue,
            publish_lock: Arc::new(PublishLock::new()),
        })
    }

    /// All configured domain ids.
    pub fn domains(&self) -> Vec<Domain> {
        self.config.domains.keys().cloned().collect()
    }

    /// Chain id of a configured domain.
    pub fn chain_id(&self, domain: &Domain) -> Option<u64> {
        self.config.domains.get(domain).map(|d| d.chain_id)
    }
}
