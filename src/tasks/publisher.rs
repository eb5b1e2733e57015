//! Broker Message Publishing Task
//!
//! Walks every origin/destination pair, assembles provable batches of
//! pending transfers against the destination's latest received aggregate
//! root, and publishes them onto the broker queue for the proof-generation
//! stage. The batch is recomputed from the store and the destination chain
//! on every cycle; nothing about a previously published batch is trusted.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::context::AgentContext;
use crate::error::AgentError;
use crate::types::{AgentMode, BrokerMessage, Domain, Transfer, TransferStatus};

// ============================================================================
// PUBLISH LOCK
// ============================================================================

/// Process-wide guard ensuring a single publish cycle runs at a time.
///
/// A cycle that finds the lock held returns without publishing; overlapping
/// cycles would double-enqueue the same pending transfers.
#[derive(Debug, Default)]
pub struct PublishLock {
    held: AtomicBool,
}

impl PublishLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to take the lock. Returns false if a cycle already holds it.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases the lock.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}

// ============================================================================
// ROOT STATE
// ============================================================================

/// The per-pair root state a batch is pinned to.
///
/// Every field is required; a pair with any of them unresolvable gets no
/// batch this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRootState {
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

// ============================================================================
// PUBLISH CYCLE
// ============================================================================

/// One publish cycle, guarded by the process-wide lock.
pub async fn enqueue_pending(ctx: &AgentContext) -> Result<()> {
    if !ctx.publish_lock.try_acquire() {
        warn!("Publish cycle already in progress, skipping");
        return Ok(());
    }
    let result = enqueue_inner(ctx).await;
    ctx.publish_lock.release();
    result
}

async fn enqueue_inner(ctx: &AgentContext) -> Result<()> {
    // The mode is re-read every cycle; a mode switch between cycles changes
    // which root state the next batch is pinned to.
    let mode = ctx.subgraph.root_manager_mode(&ctx.config.hub_domain).await?;
    debug!("Publish cycle running in {:?} mode", mode);

    let domains = ctx.domains();
    for destination in &domains {
        let received = ctx.store.latest_aggregate_roots(destination, 1).await;
        let aggregate_root = match received.first() {
            Some(r) => r.root.clone(),
            None => {
                error!(
                    "No aggregate root received on domain {}, skipping destination",
                    destination
                );
                continue;
            }
        };

        let snapshot_roots = match mode {
            AgentMode::Optimistic => {
                match ctx.store.finalized_snapshot(&aggregate_root).await {
                    Some(snapshot) => snapshot.roots,
                    None => {
                        // Without a finalized snapshot nothing published this
                        // cycle would be provable, on any pair.
                        info!(
                            "No finalized snapshot for aggregate root {} yet, ending cycle",
                            aggregate_root
                        );
                        return Ok(());
                    }
                }
            }
            AgentMode::Slow => Vec::new(),
        };

        for origin in &domains {
            if origin == destination {
                continue;
            }
            if let Err(e) =
                enqueue_pair(ctx, origin, destination, &aggregate_root, &snapshot_roots).await
            {
                error!(
                    "Failed to enqueue batch for pair {} -> {}: {:#}",
                    origin, destination, e
                );
            }
        }
    }
    Ok(())
}

/// Builds and publishes at most one batch for one origin/destination pair.
async fn enqueue_pair(
    ctx: &AgentContext,
    origin: &Domain,
    destination: &Domain,
    aggregate_root: &str,
    snapshot_roots: &[String],
) -> Result<()> {
    let now = Utc::now().timestamp() as u64;
    let last = ctx.store.last_batch_time(origin, destination).await;
    if now.saturating_sub(last) < ctx.config.agent.batch_interval_secs {
        debug!(
            "Batch interval not elapsed for pair {} -> {}, skipping",
            origin, destination
        );
        return Ok(());
    }

    let state = read_pair_state(ctx, origin, destination, aggregate_root, snapshot_roots).await?;

    let pending = ctx
        .store
        .pending_transfers(origin, destination, ctx.config.agent.batch_size)
        .await;
    if pending.is_empty() {
        debug!("No pending transfers for pair {} -> {}", origin, destination);
        return Ok(());
    }

    let message = match create_broker_message(ctx, origin, destination, pending, &state).await? {
        Some(message) => message,
        None => {
            debug!(
                "All pending transfers for pair {} -> {} already processed on-chain",
                origin, destination
            );
            return Ok(());
        }
    };

    let transfer_ids: Vec<String> = message
        .messages
        .iter()
        .map(|t| t.transfer_id.clone())
        .collect();

    ctx.queue.publish(&message).await?;
    ctx.store
        .set_transfer_status(&transfer_ids, TransferStatus::Queued)
        .await;
    ctx.store.set_last_batch_time(origin, destination, now).await;
    info!(
        "Enqueued {} transfers for pair {} -> {} against root {}",
        transfer_ids.len(),
        origin,
        destination,
        message.message_root
    );
    Ok(())
}

/// Resolves the full root state for a pair from the store.
///
/// Fails with [`AgentError::MissingRootState`] naming the first absent
/// value; a partially resolved state is never returned.
pub async fn read_pair_state(
    ctx: &AgentContext,
    origin: &Domain,
    destination: &Domain,
    aggregate_root: &str,
    snapshot_roots: &[String],
) -> Result<PairRootState> {
    let missing = |field: &'static str| AgentError::MissingRootState {
        origin_domain: origin.clone(),
        destination_domain: destination.clone(),
        field,
    };

    // The root, its count, its timestamp, and its index come from one
    // record read so the batch never mixes root state from different
    // points in time.
    let root_message = ctx
        .store
        .latest_message_root(origin, aggregate_root)
        .await
        .ok_or_else(|| missing("message_root"))?;
    let message_root_index = root_message
        .aggregate_index
        .ok_or_else(|| missing("message_root_index"))?;
    let aggregate_root_count = ctx
        .store
        .aggregate_root_count(aggregate_root)
        .await
        .ok_or_else(|| missing("aggregate_root_count"))?;

    Ok(PairRootState {
        message_root: root_message.root,
        message_root_index,
        message_root_count: root_message.count,
        aggregate_root: aggregate_root.to_string(),
        aggregate_root_count,
        snapshot_roots: snapshot_roots.to_vec(),
    })
}

/// Assembles one broker message from pending transfers and the pair's root
/// state, dropping transfers the destination has already processed.
///
/// # Returns
///
/// * `Ok(Some(message))` - A non-empty batch ready to publish
/// * `Ok(None)` - Every candidate transfer was already processed on-chain
/// * `Err` - The destination is unconfigured or the on-chain read failed
pub async fn create_broker_message(
    ctx: &AgentContext,
    origin: &Domain,
    destination: &Domain,
    messages: Vec<Transfer>,
    state: &PairRootState,
) -> Result<Option<BrokerMessage>> {
    let destination_config = ctx
        .config
        .domains
        .get(destination)
        .ok_or_else(|| AgentError::DestinationDomainNotConfigured(destination.clone()))?;

    // The destination tree's processed-leaf count is the source of truth
    // for what still needs proving; the local status flag is only a hint.
    let processed_count = ctx
        .chain
        .processed_leaf_count(
            destination_config.chain_id,
            &destination_config.deployments.merkle_tree,
        )
        .await?;

    let unprocessed: Vec<Transfer> = messages
        .into_iter()
        .filter(|t| t.nonce >= processed_count)
        .collect();
    if unprocessed.is_empty() {
        return Ok(None);
    }

    Ok(Some(BrokerMessage {
        messages: unprocessed,
        origin_domain: origin.clone(),
        destination_domain: destination.clone(),
        message_root: state.message_root.clone(),
        message_root_index: state.message_root_index,
        message_root_count: state.message_root_count,
        aggregate_root: state.aggregate_root.clone(),
        aggregate_root_count: state.aggregate_root_count,
        snapshot_roots: state.snapshot_roots.clone(),
    }))
}

// ============================================================================
// TESTS
// ============================================================================
