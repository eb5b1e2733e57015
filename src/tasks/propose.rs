//! Optimistic Root Proposal Task
//!
//! Drives the hub side of the optimistic root lifecycle: verifies that the
//! hub root manager and every spoke connector agree on the finalization
//! mode, proposes the hub's latest pending snapshot, then attempts to
//! finalize the outstanding proposal on each spoke whose dispute window has
//! closed. A heartbeat URL, when configured, is hit only after a run where
//! every step succeeded.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::chain::encode_propose_call;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::relayer::send_with_backup;
use crate::tasks::finalize::finalize_spoke;
use crate::types::AgentMode;

/// One propose/finalize cycle.
///
/// A mode disagreement between the hub and any spoke aborts the whole run
/// with an error: acting on half-switched contracts could propose roots the
/// spokes will never finalize.
pub async fn run_propose_cycle(ctx: &AgentContext) -> Result<()> {
    let hub = &ctx.config.hub_domain;
    let hub_mode = ctx.subgraph.root_manager_mode(hub).await?;

    let spokes: Vec<_> = ctx
        .domains()
        .into_iter()
        .filter(|d| d != hub)
        .collect();

    for spoke in &spokes {
        let spoke_mode = ctx.subgraph.spoke_connector_mode(spoke).await?;
        if spoke_mode != hub_mode {
            return Err(AgentError::ModeMismatch {
                hub_domain: hub.clone(),
                hub_mode,
                spoke_domain: spoke.clone(),
                spoke_mode,
            }
            .into());
        }
    }

    if hub_mode == AgentMode::Slow {
        info!("Agents running in slow mode, no optimistic root to propose");
        return Ok(());
    }

    let mut all_ok = true;
    if let Err(e) = propose_hub(ctx).await {
        error!("Hub proposal step failed: {:#}", e);
        all_ok = false;
    }
    for spoke in &spokes {
        if let Err(e) = finalize_spoke(ctx, spoke).await {
            error!("Finalize step failed for spoke {}: {:#}", spoke, e);
            all_ok = false;
        }
    }

    if all_ok {
        if let Some(ref heartbeat_url) = ctx.config.health.propose_url {
            if let Err(e) = reqwest::get(heartbeat_url).await {
                warn!("Heartbeat request failed: {:#}", e);
            }
        }
    }
    Ok(())
}

/// Proposes the hub's latest pending snapshot to the root manager.
///
/// A no-op when there is nothing to propose or a proposal is already
/// outstanding; the outstanding one has to finalize or be disputed before
/// the next can go out.
pub async fn propose_hub(ctx: &AgentContext) -> Result<()> {
    let hub = &ctx.config.hub_domain;
    let hub_config = &ctx.config.domains[hub];
    let root_manager = hub_config
        .deployments
        .root_manager
        .as_ref()
        .context("Hub domain has no root manager deployment")?;

    let snapshot = match ctx.store.latest_pending_snapshot().await {
        Some(snapshot) => snapshot,
        None => {
            info!("No pending snapshot to propose");
            return Ok(());
        }
    };
    if let Some(outstanding) = ctx.store.proposed_optimistic_root(hub).await {
        info!(
            "Proposal for aggregate root {} still outstanding, not proposing",
            outstanding.aggregate_root
        );
        return Ok(());
    }

    let data = encode_propose_call(&snapshot.aggregate_root, snapshot.timestamp)?;
    let task_id = send_with_backup(&ctx.relayers, hub_config.chain_id, root_manager, &data)
        .await
        .context("Failed to submit aggregate root proposal")?;
    info!(
        "Proposed aggregate root {} to root manager: task {}",
        snapshot.aggregate_root, task_id
    );
    Ok(())
}
