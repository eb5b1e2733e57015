//! Transfer Ingestion Task
//!
//! Polls the indexer gateway for newly finalized origin-side transfers,
//! advances the per-domain nonce cursor, records nonce gaps for backfill,
//! and merges destination-side observations into the cache. A companion
//! cycle re-queries the recorded gaps until they resolve.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::context::AgentContext;
use crate::subgraph::OriginTransferQuery;
use crate::types::{Domain, Transfer};

/// One ingestion cycle across all configured domains.
///
/// Domains the indexer reports no block height for are skipped for the
/// cycle. The query window on each remaining domain ends at the latest
/// indexed block minus that domain's confirmation depth, so reorg-prone
/// tip blocks never enter the cache.
pub async fn poll_transfers(ctx: &AgentContext) -> Result<()> {
    let domains = ctx.domains();
    let block_numbers = ctx.subgraph.latest_block_numbers(&domains).await?;

    let mut queries = Vec::new();
    for domain in &domains {
        let latest_block = match block_numbers.get(domain) {
            Some(block) => *block,
            None => {
                warn!("No latest block number for domain {}, skipping cycle", domain);
                continue;
            }
        };

        let domain_config = &ctx.config.domains[domain];
        let max_block_number = latest_block.saturating_sub(domain_config.confirmations);
        let from_nonce = next_query_nonce(
            ctx.store.latest_nonce(domain).await,
            domain_config.start_nonce,
        );

        queries.push(OriginTransferQuery {
            origin_domain: domain.clone(),
            from_nonce,
            max_block_number,
            destination_domains: domains.clone(),
        });
    }

    if queries.is_empty() {
        return Ok(());
    }

    let response = ctx.subgraph.origin_transfers(&queries).await?;
    debug!(
        "Ingestion cycle fetched {} transfers across {} domains",
        response.transfers.len(),
        queries.len()
    );

    // Detect gaps per origin domain before the cursor moves
    let mut observed: HashMap<Domain, Vec<u64>> = HashMap::new();
    for transfer in &response.transfers {
        observed
            .entry(transfer.origin_domain.clone())
            .or_default()
            .push(transfer.nonce);
    }
    for (domain, nonces) in &observed {
        // Gaps are judged within the observed range only; nonces below the
        // first observed one were never emitted and must not be queued for
        // backfill, where they could never resolve.
        let min_nonce = nonces.iter().copied().min().unwrap_or(0);
        let max_nonce = nonces.iter().copied().max().unwrap_or(0);
        let missing = find_missing_nonces(min_nonce, max_nonce, nonces);
        if !missing.is_empty() {
            info!(
                "Detected {} missing nonces on domain {}: {:?}",
                missing.len(),
                domain,
                missing
            );
            ctx.store.add_missing_nonces(domain, &missing).await;
        }
        ctx.store.set_latest_nonce(domain, max_nonce).await;
    }

    // The indexer's nonce frontier can run ahead of the confirmed window;
    // the cursor is monotonic so the larger value wins either way.
    for (domain, latest) in &response.latest_nonces {
        ctx.store.set_latest_nonce(domain, *latest).await;
    }

    store_transfers(ctx, response.transfers).await?;
    Ok(())
}

/// One backfill cycle over the recorded nonce gaps.
///
/// Each domain's gap set is re-queried a page at a time. Nonces the indexer
/// now returns a transfer for leave the gap set whether or not the transfer
/// itself is storable; the remainder stay queued for the next cycle.
pub async fn backfill_missing(ctx: &AgentContext) -> Result<()> {
    for domain in ctx.domains() {
        let page = ctx
            .store
            .missing_nonces(&domain, 0, ctx.config.agent.gap_page_size)
            .await;
        if page.is_empty() {
            continue;
        }

        let found = ctx.subgraph.transfers_by_nonces(&domain, &page).await?;
        if found.is_empty() {
            debug!(
                "Backfill found none of {} missing nonces on domain {}",
                page.len(),
                domain
            );
            continue;
        }

        let resolved: Vec<u64> = found.iter().map(|t| t.nonce).collect();
        info!(
            "Backfill resolved {} of {} missing nonces on domain {}",
            resolved.len(),
            page.len(),
            domain
        );
        ctx.store.remove_missing_nonces(&domain, &resolved).await;
        store_transfers(ctx, found).await?;
    }
    Ok(())
}

/// The inclusive lower nonce bound for the next origin-side query.
///
/// The cursor and the configured start nonce are both floors; queries
/// resume one past the higher of the two, except from a cold start where
/// nonce 0 itself must still be fetched.
pub fn next_query_nonce(cursor: Option<u64>, start_nonce: Option<u64>) -> u64 {
    let latest = cursor.unwrap_or(0).max(start_nonce.unwrap_or(0));
    if latest == 0 {
        0
    } else {
        latest + 1
    }
}

/// Nonces in `[from, to]` absent from the observed set.
pub fn find_missing_nonces(from: u64, to: u64, observed: &[u64]) -> Vec<u64> {
    let seen: HashSet<u64> = observed.iter().copied().collect();
    (from..=to).filter(|n| !seen.contains(n)).collect()
}

/// Stores transfers whose destination is configured, then merges in their
/// destination-side records.
async fn store_transfers(ctx: &AgentContext, transfers: Vec<Transfer>) -> Result<()> {
    let (storable, dropped): (Vec<Transfer>, Vec<Transfer>) = transfers
        .into_iter()
        .partition(|t| ctx.config.domains.contains_key(&t.destination_domain));

    for transfer in &dropped {
        warn!(
            "Dropping transfer {} with unconfigured destination domain {}",
            transfer.transfer_id, transfer.destination_domain
        );
    }
    if storable.is_empty() {
        return Ok(());
    }

    ctx.store.save_transfers(&storable).await;

    let transfer_ids: Vec<String> = storable.iter().map(|t| t.transfer_id.clone()).collect();
    let destination_side = ctx.subgraph.destination_transfers(&transfer_ids).await?;
    if !destination_side.is_empty() {
        ctx.store.save_transfers(&destination_side).await;
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
