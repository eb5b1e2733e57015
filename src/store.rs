//! Agent Store Module
//!
//! In-memory persistence for the pipeline's working state: per-domain nonce
//! cursors and gap sets, the transfer cache, root-state records, and the
//! per-pair batch rate-limit timestamps. The store interface is what the
//! rest of the agent programs against; a durable backend can replace the
//! maps without touching the tasks.
//!
//! All collections sit behind `tokio::sync::RwLock`, so reads from
//! concurrent loops never block each other and writes for one domain are
//! observed in order.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use crate::types::{
    Domain, FinalizedSnapshot, ProposedOptimisticRoot, ReceivedAggregateRoot, RootMessage,
    Snapshot, Transfer, TransferStatus,
};

/// Shared state store for all agent loops.
#[derive(Debug, Default)]
pub struct AgentStore {
    /// Highest contiguous nonce observed per origin domain
    cursors: RwLock<HashMap<Domain, u64>>,
    /// Known-missing nonces per origin domain, kept ordered for paging
    missing: RwLock<HashMap<Domain, BTreeSet<u64>>>,
    /// Transfer records keyed by transfer id
    transfers: RwLock<HashMap<String, Transfer>>,
    /// Aggregate roots received per destination domain, in receipt order
    received_roots: RwLock<HashMap<Domain, Vec<ReceivedAggregateRoot>>>,
    /// Message roots emitted per origin domain
    message_roots: RwLock<HashMap<Domain, Vec<RootMessage>>>,
    /// Count of roots aggregated under each aggregate root
    aggregate_counts: RwLock<HashMap<String, u64>>,
    /// Finalized snapshots keyed by aggregate root
    finalized_snapshots: RwLock<HashMap<String, FinalizedSnapshot>>,
    /// Latest hub snapshot not yet proposed
    pending_snapshot: RwLock<Option<Snapshot>>,
    /// Current optimistic proposal per domain
    proposed_roots: RwLock<HashMap<Domain, ProposedOptimisticRoot>>,
    /// Unix timestamp of the last successful batch per (origin, destination)
    last_batch: RwLock<HashMap<(Domain, Domain), u64>>,
}

impl AgentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Nonce cursor
    // ------------------------------------------------------------------

    /// Highest observed nonce for a domain, `None` before the first
    /// ingestion cycle.
    pub async fn latest_nonce(&self, domain: &Domain) -> Option<u64> {
        self.cursors.read().await.get(domain).copied()
    }

    /// Advance the nonce cursor for a domain.
    ///
    /// The cursor is monotonic: a write below the current value is ignored,
    /// so a later cycle can never move the fetch frontier backwards.
    pub async fn set_latest_nonce(&self, domain: &Domain, nonce: u64) {
        let mut cursors = self.cursors.write().await;
        let entry = cursors.entry(domain.clone()).or_insert(nonce);
        if nonce > *entry {
            *entry = nonce;
        }
    }

    // ------------------------------------------------------------------
    // Gap set
    // ------------------------------------------------------------------

    /// Record nonces skipped during ingestion for later backfill.
    pub async fn add_missing_nonces(&self, domain: &Domain, nonces: &[u64]) {
        let mut missing = self.missing.write().await;
        missing
            .entry(domain.clone())
            .or_default()
            .extend(nonces.iter().copied());
    }

    /// Drop successfully backfilled nonces from the gap set.
    pub async fn remove_missing_nonces(&self, domain: &Domain, nonces: &[u64]) {
        let mut missing = self.missing.write().await;
        if let Some(set) = missing.get_mut(domain) {
            for nonce in nonces {
                set.remove(nonce);
            }
        }
    }

    /// An ordered page of the gap set for a domain.
    pub async fn missing_nonces(&self, domain: &Domain, offset: usize, limit: usize) -> Vec<u64> {
        let missing = self.missing.read().await;
        match missing.get(domain) {
            Some(set) => set.iter().skip(offset).take(limit).copied().collect(),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Transfer cache
    // ------------------------------------------------------------------

    /// Idempotent upsert of transfer records.
    ///
    /// A record seen for the first time is stored with `Pending` status. On
    /// an update the locally managed status is preserved and destination-
    /// and origin-side fields already present are kept unless the incoming
    /// record supplies them.
    pub async fn save_transfers(&self, records: &[Transfer]) {
        let mut transfers = self.transfers.write().await;
        for record in records {
            match transfers.get_mut(&record.transfer_id) {
                Some(existing) => {
                    let mut merged = record.clone();
                    merged.status = existing.status;
                    merged.origin_block_number =
                        record.origin_block_number.or(existing.origin_block_number);
                    merged.origin_tx_hash = record
                        .origin_tx_hash
                        .clone()
                        .or_else(|| existing.origin_tx_hash.clone());
                    merged.destination_tx_hash = record
                        .destination_tx_hash
                        .clone()
                        .or_else(|| existing.destination_tx_hash.clone());
                    *existing = merged;
                }
                None => {
                    let mut fresh = record.clone();
                    fresh.status = TransferStatus::Pending;
                    transfers.insert(record.transfer_id.clone(), fresh);
                }
            }
        }
    }

    /// Look up a single transfer by id.
    pub async fn transfer(&self, transfer_id: &str) -> Option<Transfer> {
        self.transfers.read().await.get(transfer_id).cloned()
    }

    /// Pending transfers for one origin/destination pair, in nonce order.
    pub async fn pending_transfers(
        &self,
        origin: &Domain,
        destination: &Domain,
        limit: usize,
    ) -> Vec<Transfer> {
        let transfers = self.transfers.read().await;
        let mut pending: Vec<Transfer> = transfers
            .values()
            .filter(|t| {
                t.status == TransferStatus::Pending
                    && &t.origin_domain == origin
                    && &t.destination_domain == destination
            })
            .cloned()
            .collect();
        pending.sort_by_key(|t| t.nonce);
        pending.truncate(limit);
        pending
    }

    /// Update the status of a set of transfers.
    pub async fn set_transfer_status(&self, transfer_ids: &[String], status: TransferStatus) {
        let mut transfers = self.transfers.write().await;
        for id in transfer_ids {
            if let Some(record) = transfers.get_mut(id) {
                record.status = status;
            }
        }
    }

    // ------------------------------------------------------------------
    // Root state
    // ------------------------------------------------------------------

    /// Record an aggregate root received on a destination domain.
    pub async fn save_received_aggregate_root(&self, received: ReceivedAggregateRoot) {
        let mut roots = self.received_roots.write().await;
        roots.entry(received.domain.clone()).or_default().push(received);
    }

    /// The most recently received aggregate roots on a domain, newest first.
    pub async fn latest_aggregate_roots(
        &self,
        domain: &Domain,
        limit: usize,
    ) -> Vec<ReceivedAggregateRoot> {
        let roots = self.received_roots.read().await;
        match roots.get(domain) {
            Some(list) => {
                let mut latest: Vec<ReceivedAggregateRoot> = list.clone();
                latest.sort_by(|a, b| b.block_number.cmp(&a.block_number));
                latest.truncate(limit);
                latest
            }
            None => Vec::new(),
        }
    }

    /// Record a message root emitted by an origin domain.
    pub async fn save_root_message(&self, origin: &Domain, message: RootMessage) {
        let mut roots = self.message_roots.write().await;
        roots.entry(origin.clone()).or_default().push(message);
    }

    /// The origin's latest message root included under an aggregate root.
    pub async fn latest_message_root(
        &self,
        origin: &Domain,
        aggregate_root: &str,
    ) -> Option<RootMessage> {
        let roots = self.message_roots.read().await;
        roots.get(origin).and_then(|list| {
            list.iter()
                .filter(|m| m.aggregate_root.as_deref() == Some(aggregate_root))
                .max_by_key(|m| m.count)
                .cloned()
        })
    }

    /// Record the count of roots aggregated under an aggregate root.
    pub async fn save_aggregate_root_count(&self, aggregate_root: &str, count: u64) {
        self.aggregate_counts
            .write()
            .await
            .insert(aggregate_root.to_string(), count);
    }

    /// Count of roots aggregated under an aggregate root.
    pub async fn aggregate_root_count(&self, aggregate_root: &str) -> Option<u64> {
        self.aggregate_counts
            .read()
            .await
            .get(aggregate_root)
            .copied()
    }

    /// Record a finalized snapshot.
    pub async fn save_finalized_snapshot(&self, snapshot: FinalizedSnapshot) {
        self.finalized_snapshots
            .write()
            .await
            .insert(snapshot.aggregate_root.clone(), snapshot);
    }

    /// Finalized snapshot pinned to an aggregate root, if one exists.
    pub async fn finalized_snapshot(&self, aggregate_root: &str) -> Option<FinalizedSnapshot> {
        self.finalized_snapshots
            .read()
            .await
            .get(aggregate_root)
            .cloned()
    }

    /// Record the hub's latest not-yet-proposed snapshot.
    pub async fn save_pending_snapshot(&self, snapshot: Snapshot) {
        *self.pending_snapshot.write().await = Some(snapshot);
    }

    /// The hub's latest not-yet-proposed snapshot.
    pub async fn latest_pending_snapshot(&self) -> Option<Snapshot> {
        self.pending_snapshot.read().await.clone()
    }

    /// Record the current optimistic proposal for a domain.
    pub async fn save_proposed_optimistic_root(
        &self,
        domain: &Domain,
        proposed: ProposedOptimisticRoot,
    ) {
        self.proposed_roots
            .write()
            .await
            .insert(domain.clone(), proposed);
    }

    /// Current optimistic proposal for a domain, if any.
    pub async fn proposed_optimistic_root(&self, domain: &Domain) -> Option<ProposedOptimisticRoot> {
        self.proposed_roots.read().await.get(domain).cloned()
    }

    // ------------------------------------------------------------------
    // Batch rate limiting
    // ------------------------------------------------------------------

    /// Unix timestamp of the last successful batch for a pair, 0 if none.
    pub async fn last_batch_time(&self, origin: &Domain, destination: &Domain) -> u64 {
        self.last_batch
            .read()
            .await
            .get(&(origin.clone(), destination.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Record the timestamp of a successful batch for a pair.
    pub async fn set_last_batch_time(&self, origin: &Domain, destination: &Domain, time: u64) {
        self.last_batch
            .write()
            .await
            .insert((origin.clone(), destination.clone()), time);
    }
}

// ============================================================================
// TESTS
// ============================================================================
