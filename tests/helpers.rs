//! Shared test helpers
//!
//! Configuration builders, record builders, and mock server setup used by
//! the integration tests. Mock servers stand in for the indexer gateway,
//! the JSON-RPC endpoints, the relayer backends, and the broker queue.

use std::collections::HashMap;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier::config::{
    AgentConfig, Config, DeploymentsConfig, DomainConfig, HealthConfig, IndexerConfig,
    QueueConfig, RelayerConfig, RelayerKind,
};
use courier::context::AgentContext;
use courier::store::AgentStore;
use courier::types::{Domain, ReceivedAggregateRoot, RootMessage, Transfer, TransferStatus};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Hub domain id used across tests
#[allow(dead_code)]
pub const HUB_DOMAIN: &str = "1111";

/// Spoke/destination domain id used across tests
#[allow(dead_code)]
pub const SPOKE_DOMAIN: &str = "2221";

/// Domain id absent from every test configuration
#[allow(dead_code)]
pub const UNCONFIGURED_DOMAIN: &str = "9991";

/// Chain id of the hub domain in test configurations
#[allow(dead_code)]
pub const HUB_CHAIN_ID: u64 = 31337;

/// Chain id of the spoke domain in test configurations
#[allow(dead_code)]
pub const SPOKE_CHAIN_ID: u64 = 31338;

/// Dummy aggregate root (bytes32)
#[allow(dead_code)]
pub const DUMMY_AGGREGATE_ROOT: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";

/// Dummy message root (bytes32)
#[allow(dead_code)]
pub const DUMMY_MESSAGE_ROOT: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000002";

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Builds a two-domain test configuration pointed at mock servers.
///
/// The hub is [`HUB_DOMAIN`] and carries a root manager deployment. The
/// batch interval is zeroed so publish tests are never rate limited.
#[allow(dead_code)]
pub fn build_test_config(
    indexer_url: &str,
    rpc_url: &str,
    queue_url: &str,
    relayer_url: &str,
) -> Config {
    let mut domains = HashMap::new();
    domains.insert(
        HUB_DOMAIN.to_string(),
        DomainConfig {
            chain_id: HUB_CHAIN_ID,
            rpc_url: rpc_url.to_string(),
            confirmations: 5,
            start_nonce: None,
            deployments: DeploymentsConfig {
                spoke_connector: "0x0000000000000000000000000000000000000001".to_string(),
                merkle_tree: "0x0000000000000000000000000000000000000002".to_string(),
                root_manager: Some("0x0000000000000000000000000000000000000003".to_string()),
            },
        },
    );
    domains.insert(
        SPOKE_DOMAIN.to_string(),
        DomainConfig {
            chain_id: SPOKE_CHAIN_ID,
            rpc_url: rpc_url.to_string(),
            confirmations: 5,
            start_nonce: None,
            deployments: DeploymentsConfig {
                spoke_connector: "0x0000000000000000000000000000000000000011".to_string(),
                merkle_tree: "0x0000000000000000000000000000000000000012".to_string(),
                root_manager: None,
            },
        },
    );

    Config {
        hub_domain: HUB_DOMAIN.to_string(),
        domains,
        indexer: IndexerConfig {
            url: indexer_url.to_string(),
        },
        queue: QueueConfig {
            url: queue_url.to_string(),
            channel: "proofs".to_string(),
        },
        relayers: vec![RelayerConfig {
            kind: RelayerKind::Native,
            url: relayer_url.to_string(),
            api_key: None,
        }],
        agent: AgentConfig {
            batch_interval_secs: 0,
            request_timeout_ms: 5_000,
            ..AgentConfig::default()
        },
        health: HealthConfig::default(),
    }
}

/// Builds an [`AgentContext`] from a test configuration.
#[allow(dead_code)]
pub fn build_test_context(config: Config) -> AgentContext {
    AgentContext::new(config).expect("test context should build")
}

// ============================================================================
// RECORD BUILDERS
// ============================================================================

/// Builds a pending transfer from [`HUB_DOMAIN`] to [`SPOKE_DOMAIN`].
#[allow(dead_code)]
pub fn make_transfer(nonce: u64) -> Transfer {
    Transfer {
        transfer_id: format!("0x{:064x}", 0xaa00 + nonce),
        origin_domain: HUB_DOMAIN.to_string(),
        destination_domain: SPOKE_DOMAIN.to_string(),
        nonce,
        leaf: format!("0x{:064x}", 0xbb00 + nonce),
        message_body: "0x".to_string(),
        origin_block_number: Some(50),
        origin_tx_hash: None,
        destination_tx_hash: None,
        status: TransferStatus::Pending,
    }
}

/// Seeds the store with a complete root state for one origin/destination
/// pair: a received aggregate root on the destination, a message root for
/// the origin included under that aggregate, and the aggregate's count.
#[allow(dead_code)]
pub async fn seed_pair_root_state(store: &AgentStore, origin: &Domain, destination: &Domain) {
    store
        .save_received_aggregate_root(ReceivedAggregateRoot {
            root: DUMMY_AGGREGATE_ROOT.to_string(),
            domain: destination.clone(),
            block_number: 90,
        })
        .await;
    store
        .save_root_message(
            origin,
            RootMessage {
                root: DUMMY_MESSAGE_ROOT.to_string(),
                count: 7,
                sent_timestamp: 1_700_000_000,
                aggregate_root: Some(DUMMY_AGGREGATE_ROOT.to_string()),
                aggregate_index: Some(3),
            },
        )
        .await;
    store.save_aggregate_root_count(DUMMY_AGGREGATE_ROOT, 5).await;
}

// ============================================================================
// MOCK SERVER SETUP HELPERS
// ============================================================================

/// Mounts the indexer's latest-block-number endpoint.
#[allow(dead_code)]
pub async fn mount_block_numbers(server: &MockServer, blocks: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/block-numbers"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "block_numbers": blocks })),
        )
        .mount(server)
        .await;
}

/// Mounts the indexer's origin-transfer endpoint.
#[allow(dead_code)]
pub async fn mount_origin_transfers(
    server: &MockServer,
    transfers: &[Transfer],
    latest_nonces: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(path("/origin-transfers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transfers": transfers,
            "latest_nonces": latest_nonces,
        })))
        .mount(server)
        .await;
}

/// Mounts the indexer's targeted nonce lookup endpoint.
#[allow(dead_code)]
pub async fn mount_transfers_by_nonces(server: &MockServer, transfers: &[Transfer]) {
    Mock::given(method("POST"))
        .and(path("/transfers-by-nonces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transfers": transfers })))
        .mount(server)
        .await;
}

/// Mounts an empty destination-transfer endpoint.
#[allow(dead_code)]
pub async fn mount_empty_destination_transfers(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/destination-transfers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "transfers": [] })))
        .mount(server)
        .await;
}

/// Mounts the root manager mode endpoint for a domain.
#[allow(dead_code)]
pub async fn mount_root_manager_mode(server: &MockServer, domain: &str, mode: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/root-manager-mode/{}", domain)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mode": mode })))
        .mount(server)
        .await;
}

/// Mounts the spoke connector mode endpoint for a domain.
#[allow(dead_code)]
pub async fn mount_spoke_connector_mode(server: &MockServer, domain: &str, mode: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/spoke-connector-mode/{}", domain)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mode": mode })))
        .mount(server)
        .await;
}

/// Mounts a JSON-RPC endpoint whose every `eth_call` returns the given
/// uint256 value.
#[allow(dead_code)]
pub async fn mount_eth_call_result(server: &MockServer, value: u64) {
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": format!("0x{:064x}", value),
        })))
        .mount(server)
        .await;
}

/// Mounts the broker queue publish endpoint, asserting it is hit exactly
/// `expected` times.
#[allow(dead_code)]
pub async fn mount_queue_publish(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/publish"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts a native relayer accept endpoint for a chain, asserting it is
/// hit exactly `expected` times.
#[allow(dead_code)]
pub async fn mount_native_relayer(server: &MockServer, chain_id: u64, expected: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/relays/{}", chain_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "taskId": "task-1" })))
        .expect(expected)
        .mount(server)
        .await;
}
