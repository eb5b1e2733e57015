//! Chain Reader Module
//!
//! Read-only JSON-RPC client for the configured domains, plus the small
//! calldata codec the dispatch paths need. State-changing transactions never
//! go through here; they are handed to relayer backends as encoded calldata.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

// ============================================================================
// CALLDATA CODEC
// ============================================================================

// Function selectors for the contract calls this agent issues. Arguments
// are ABI-encoded as 32-byte words appended after the selector.

/// Selector of the merkle tree manager's processed-leaf counter.
const SELECTOR_PROCESSED_COUNT: &str = "0x0e1bd076";
/// Selector of `proposeAggregateRoot(bytes32,uint256)` on the root manager.
const SELECTOR_PROPOSE: &str = "0x3b1f7d1a";
/// Selector of `finalize(bytes32,uint256,uint256)` on a spoke connector.
const SELECTOR_FINALIZE: &str = "0x82f25e3f";

/// Encodes a u64 as a 32-byte ABI word, without the 0x prefix.
pub fn word_from_u64(value: u64) -> String {
    format!("{:064x}", value)
}

/// Normalizes a 0x-prefixed bytes32 value into a 32-byte ABI word.
pub fn word_from_hex32(value: &str) -> Result<String> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(stripped)
        .with_context(|| format!("Invalid hex value: {}", value))?;
    if bytes.len() != 32 {
        anyhow::bail!("Expected 32-byte value, got {} bytes: {}", bytes.len(), value);
    }
    Ok(hex::encode(bytes))
}

/// Calldata for the processed-leaf count read on a merkle tree manager.
pub fn encode_processed_count_call() -> String {
    SELECTOR_PROCESSED_COUNT.to_string()
}

/// Calldata for a hub aggregate-root proposal.
pub fn encode_propose_call(aggregate_root: &str, snapshot_timestamp: u64) -> Result<String> {
    Ok(format!(
        "{}{}{}",
        SELECTOR_PROPOSE,
        word_from_hex32(aggregate_root)?,
        word_from_u64(snapshot_timestamp)
    ))
}

/// Calldata for a spoke-side proposal finalization.
pub fn encode_finalize_call(
    aggregate_root: &str,
    root_timestamp: u64,
    end_of_dispute: u64,
) -> Result<String> {
    Ok(format!(
        "{}{}{}{}",
        SELECTOR_FINALIZE,
        word_from_hex32(aggregate_root)?,
        word_from_u64(root_timestamp),
        word_from_u64(end_of_dispute)
    ))
}

/// Decodes a uint256 `eth_call` result into a u64.
///
/// An empty result ("0x") decodes as 0, matching the behavior of reads
/// against not-yet-initialized counters.
pub fn decode_u64_result(raw: &str) -> Result<u64> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    if stripped.is_empty() || stripped.chars().all(|c| c == '0') {
        return Ok(0);
    }
    u64::from_str_radix(stripped.trim_start_matches('0'), 16)
        .with_context(|| format!("Failed to decode call result: {}", raw))
}

// ============================================================================
// JSON-RPC CLIENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Read-only client over the configured domains' JSON-RPC endpoints,
/// keyed by chain id.
#[derive(Debug, Clone)]
pub struct ChainReader {
    client: Client,
    rpc_urls: HashMap<u64, String>,
}

impl ChainReader {
    /// Creates a reader over a chain-id to RPC-URL map.
    pub fn new(rpc_urls: HashMap<u64, String>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .no_proxy()
            .build()
            .context("Failed to build chain reader HTTP client")?;

        Ok(Self { client, rpc_urls })
    }

    /// Issues an `eth_call` against a contract and returns the raw result.
    pub async fn call(&self, chain_id: u64, to: &str, data: &str) -> Result<String> {
        let rpc_url = self
            .rpc_urls
            .get(&chain_id)
            .with_context(|| format!("No RPC endpoint configured for chain id {}", chain_id))?;

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{"to": to, "data": data}, "latest"],
        });

        let response = self
            .client
            .post(rpc_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("eth_call request to chain {} failed", chain_id))?
            .error_for_status()
            .with_context(|| format!("RPC endpoint for chain {} returned an error", chain_id))?;

        let parsed: RpcResponse = response
            .json()
            .await
            .context("Failed to parse eth_call response")?;

        if let Some(error) = parsed.error {
            anyhow::bail!(
                "eth_call on chain {} reverted: {} (code {})",
                chain_id,
                error.message,
                error.code
            );
        }
        parsed
            .result
            .with_context(|| format!("eth_call on chain {} returned no result", chain_id))
    }

    /// Number of leaves the destination's merkle tree manager has already
    /// processed for a given origin-domain tree.
    pub async fn processed_leaf_count(&self, chain_id: u64, merkle_tree: &str) -> Result<u64> {
        let raw = self
            .call(chain_id, merkle_tree, &encode_processed_count_call())
            .await?;
        decode_u64_result(&raw)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_u64_words() {
        assert_eq!(
            word_from_u64(0),
            "0000000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(
            word_from_u64(255),
            "00000000000000000000000000000000000000000000000000000000000000ff"
        );
    }

    #[test]
    fn normalizes_bytes32_words() {
        let root = format!("0x{}", "ab".repeat(32));
        assert_eq!(word_from_hex32(&root).unwrap(), "ab".repeat(32));
        assert!(word_from_hex32("0x1234").is_err());
        assert!(word_from_hex32("0xzz").is_err());
    }

    #[test]
    fn finalize_calldata_layout() {
        let root = format!("0x{}", "11".repeat(32));
        let data = encode_finalize_call(&root, 1_700_000_000, 42).unwrap();
        assert!(data.starts_with(SELECTOR_FINALIZE));
        // selector + three 32-byte words
        assert_eq!(data.len(), 10 + 64 * 3);
        assert!(data.ends_with(&word_from_u64(42)));
    }

    #[test]
    fn decodes_uint_results() {
        assert_eq!(decode_u64_result("0x").unwrap(), 0);
        assert_eq!(
            decode_u64_result(&format!("0x{}", word_from_u64(0))).unwrap(),
            0
        );
        assert_eq!(
            decode_u64_result(&format!("0x{}", word_from_u64(1234))).unwrap(),
            1234
        );
        assert!(decode_u64_result("0xnothex").is_err());
    }
}
