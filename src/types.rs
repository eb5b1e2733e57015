//! Core Data Types
//!
//! Shared data structures for the transfer ingestion and proof-dispatch
//! pipeline: transfers observed on origin/destination domains, message and
//! aggregate root records, optimistic-root proposals, and the broker message
//! batch handed to the proof-generation stage.

use serde::{Deserialize, Serialize};

/// A chain/network participating in the bridge, identified by its domain id
/// (a numeric string, e.g. "1111").
pub type Domain = String;

// ============================================================================
// PROTOCOL MODE
// ============================================================================

/// Finalization mode reported by the hub root manager and each spoke
/// connector. The hub and every spoke must agree on the mode for a propose
/// run to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Proposed aggregate roots become finalizable after a dispute window
    Optimistic,
    /// Alternate finalization path without dispute windows
    Slow,
}

// ============================================================================
// TRANSFERS
// ============================================================================

/// Lifecycle status of a transfer within the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Observed but not yet handed to proof generation
    Pending,
    /// Enqueued in a broker message, proof generation outstanding
    Queued,
    /// Proven on the destination domain
    Proven,
}

impl Default for TransferStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A cross-domain transfer observed on its origin domain.
///
/// Identified by a globally unique transfer id. The origin-side fields are
/// immutable once the transfer is finalized on its origin domain;
/// destination-side fields are merged into the same record when the
/// destination-side observation arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Globally unique transfer identifier (0x-prefixed hash)
    pub transfer_id: String,
    /// Domain the transfer originated on
    pub origin_domain: Domain,
    /// Domain the transfer is destined for
    pub destination_domain: Domain,
    /// Per-origin-domain strictly increasing sequence number
    pub nonce: u64,
    /// Merkle leaf hash representing this transfer in the origin tree
    pub leaf: String,
    /// Opaque message payload carried across domains
    pub message_body: String,
    /// Block number of the origin-side observation
    #[serde(default)]
    pub origin_block_number: Option<u64>,
    /// Transaction hash of the origin-side observation
    #[serde(default)]
    pub origin_tx_hash: Option<String>,
    /// Transaction hash of the destination-side observation, filled in later
    #[serde(default)]
    pub destination_tx_hash: Option<String>,
    /// Local processing status, managed by this agent
    #[serde(default)]
    pub status: TransferStatus,
}

// ============================================================================
// ROOT STATE
// ============================================================================

/// A message root emitted by an origin domain.
///
/// `count` is the root's position in that domain's root sequence;
/// `sent_timestamp` is the block timestamp at which the root became
/// outbound. When the root has been included in an aggregate, the aggregate
/// root and the index of this root within the aggregate's merkle structure
/// are recorded as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootMessage {
    /// The message root value
    pub root: String,
    /// Position in the origin domain's root sequence
    pub count: u64,
    /// Block timestamp at which the root became outbound
    pub sent_timestamp: u64,
    /// Aggregate root this message root was included under, if any
    #[serde(default)]
    pub aggregate_root: Option<String>,
    /// Index of this root within the aggregate's merkle structure
    #[serde(default)]
    pub aggregate_index: Option<u64>,
}

/// An aggregate root observed as received on a destination domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedAggregateRoot {
    /// The aggregate root value
    pub root: String,
    /// Domain the root was received on
    pub domain: Domain,
    /// Block number of the receipt
    pub block_number: u64,
}

/// A snapshot produced by the hub that has not been proposed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Aggregate root computed over the snapshot's message roots
    pub aggregate_root: String,
    /// The per-domain message roots making up the snapshot
    pub roots: Vec<String>,
    /// Block timestamp the snapshot was taken at
    pub timestamp: u64,
}

/// A finalized, provable aggregate-root state usable as the basis for a
/// batch in optimistic mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedSnapshot {
    /// The finalized aggregate root
    pub aggregate_root: String,
    /// The per-domain message roots making up the snapshot
    pub roots: Vec<String>,
    /// Block at which the dispute window for this snapshot ended
    pub end_of_dispute: u64,
}

/// The hub's current optimistic proposal for a domain, finalizable once the
/// dispute window has elapsed on that domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedOptimisticRoot {
    /// The proposed aggregate root
    pub aggregate_root: String,
    /// Timestamp the root was proposed with
    pub root_timestamp: u64,
    /// Block number at which the dispute window closes
    pub end_of_dispute: u64,
}

// ============================================================================
// BROKER MESSAGE
// ============================================================================

/// One provable batch for one origin/destination pair at one point in the
/// aggregate's history, handed to the proof-generation stage.
///
/// Never constructed with an empty message list: absence of eligible
/// transfers yields no broker message at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerMessage {
    /// Unprocessed transfers in their original nonce order
    pub messages: Vec<Transfer>,
    /// Origin domain of every transfer in the batch
    pub origin_domain: Domain,
    /// Destination domain of every transfer in the batch
    pub destination_domain: Domain,
    /// The origin's message root the batch proves against
    pub message_root: String,
    /// Index of the message root within the aggregate's merkle structure
    pub message_root_index: u64,
    /// Position of the message root in the origin's root sequence
    pub message_root_count: u64,
    /// The aggregate root received on the destination
    pub aggregate_root: String,
    /// Count of roots aggregated under the aggregate root
    pub aggregate_root_count: u64,
    /// Finalized snapshot roots the batch is pinned to (optimistic mode)
    pub snapshot_roots: Vec<String>,
}
