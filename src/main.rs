//! Courier Agent Service
//!
//! Binary entry point. Loads configuration, builds the shared context, and
//! runs the agent's loops: transfer ingestion with gap backfill, broker
//! message publishing, and the optimistic root propose/finalize cycle.

use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use courier::config::Config;
use courier::context::AgentContext;
use courier::tasks::{ingest, propose, publisher};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Courier Agent");

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Courier Agent");
        println!();
        println!("Usage: courier [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  COURIER_CONFIG_PATH    Path to config file (overrides --config)");
        return Ok(());
    }

    // Check for custom config path
    let mut config_path = None;
    for (i, arg) in args.iter().enumerate() {
        if arg == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            break;
        }
    }
    if let Some(path) = config_path {
        std::env::set_var("COURIER_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    let config = Config::load()?;
    info!(
        "Configuration loaded: {} domains, hub {}",
        config.domains.len(),
        config.hub_domain
    );

    let ctx = AgentContext::new(config)?;

    tokio::try_join!(
        ingestion_loop(ctx.clone()),
        publish_loop(ctx.clone()),
        propose_loop(ctx.clone()),
    )?;
    Ok(())
}

// ============================================================================
// TASK LOOPS
// ============================================================================

/// Runs transfer ingestion and gap backfill on the polling interval.
async fn ingestion_loop(ctx: AgentContext) -> Result<()> {
    let interval = Duration::from_millis(ctx.config.agent.polling_interval_ms);
    loop {
        if let Err(e) = ingest::poll_transfers(&ctx).await {
            error!("Ingestion cycle failed: {:#}", e);
        }
        if let Err(e) = ingest::backfill_missing(&ctx).await {
            error!("Backfill cycle failed: {:#}", e);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Runs broker message publishing on the publish interval.
async fn publish_loop(ctx: AgentContext) -> Result<()> {
    let interval = Duration::from_millis(ctx.config.agent.publish_interval_ms);
    loop {
        if let Err(e) = publisher::enqueue_pending(&ctx).await {
            error!("Publish cycle failed: {:#}", e);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Runs the propose/finalize cycle on the propose interval.
///
/// A mode mismatch is the one condition that stops the loop: the agent must
/// not keep acting while the hub and spokes disagree on the finalization
/// mode.
async fn propose_loop(ctx: AgentContext) -> Result<()> {
    let interval = Duration::from_millis(ctx.config.agent.propose_interval_ms);
    loop {
        if let Err(e) = propose::run_propose_cycle(&ctx).await {
            if e.downcast_ref::<courier::error::AgentError>()
                .map(|err| matches!(err, courier::error::AgentError::ModeMismatch { .. }))
                .unwrap_or(false)
            {
                error!("Fatal mode mismatch, stopping: {:#}", e);
                return Err(e);
            }
            error!("Propose cycle failed: {:#}", e);
        }
        tokio::time::sleep(interval).await;
    }
}
