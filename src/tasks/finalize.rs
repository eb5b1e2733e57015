//! Spoke Finalization Task
//!
//! Finalizes the outstanding optimistic proposal on a spoke domain once the
//! dispute window recorded with the proposal has elapsed on that domain.

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::chain::encode_finalize_call;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::relayer::send_with_backup;
use crate::types::Domain;

/// Attempts to finalize the outstanding proposal on one spoke.
///
/// A no-op when the spoke has no outstanding proposal or its dispute window
/// is still open. The window is judged against the spoke's own latest block
/// number.
pub async fn finalize_spoke(ctx: &AgentContext, spoke: &Domain) -> Result<()> {
    if spoke == &ctx.config.hub_domain {
        return Ok(());
    }
    let spoke_config = ctx
        .config
        .domains
        .get(spoke)
        .ok_or_else(|| AgentError::NoChainIdForDomain(spoke.clone()))?;

    let proposed = match ctx.store.proposed_optimistic_root(spoke).await {
        Some(proposed) => proposed,
        None => {
            info!("No proposed optimistic root on spoke {}", spoke);
            return Ok(());
        }
    };

    let block_numbers = ctx
        .subgraph
        .latest_block_numbers(std::slice::from_ref(spoke))
        .await?;
    let latest_block = match block_numbers.get(spoke) {
        Some(block) => *block,
        None => {
            error!(
                "No latest block number for spoke {}, cannot judge dispute window",
                spoke
            );
            return Ok(());
        }
    };

    if proposed.end_of_dispute > latest_block {
        info!(
            "Dispute window still open on spoke {} ({} > {}), not finalizing",
            spoke, proposed.end_of_dispute, latest_block
        );
        return Ok(());
    }

    let data = encode_finalize_call(
        &proposed.aggregate_root,
        proposed.root_timestamp,
        proposed.end_of_dispute,
    )?;
    let task_id = send_with_backup(
        &ctx.relayers,
        spoke_config.chain_id,
        &spoke_config.deployments.spoke_connector,
        &data,
    )
    .await
    .with_context(|| format!("Failed to submit finalize on spoke {}", spoke))?;
    info!(
        "Finalized aggregate root {} on spoke {}: task {}",
        proposed.aggregate_root, spoke, task_id
    );
    Ok(())
}
