//! Integration tests for transfer ingestion and gap backfill
//!
//! These tests run full ingestion cycles against a mock indexer gateway and
//! verify cursor movement, gap detection, backfill resolution, and the
//! handling of unconfigured destination domains.

use serde_json::json;
use wiremock::MockServer;

use courier::tasks::ingest::{backfill_missing, poll_transfers};
use courier::types::TransferStatus;

#[path = "helpers.rs"]
mod helpers;
use helpers::{
    build_test_config, build_test_context, make_transfer, mount_block_numbers,
    mount_empty_destination_transfers, mount_origin_transfers, mount_transfers_by_nonces,
    HUB_DOMAIN, SPOKE_DOMAIN, UNCONFIGURED_DOMAIN,
};

/// What is tested: a nonce gap in the fetched window lands in the gap set
/// and the cursor still advances past it
/// Why: a skipped nonce must be retried later without stalling ingestion
#[tokio::test]
async fn test_poll_detects_gap_and_advances_cursor() {
    let indexer = MockServer::start().await;
    let transfers = vec![
        make_transfer(0),
        make_transfer(1),
        make_transfer(3),
        make_transfer(4),
    ];
    mount_block_numbers(&indexer, json!({ HUB_DOMAIN: 100, SPOKE_DOMAIN: 100 })).await;
    mount_origin_transfers(&indexer, &transfers, json!({ HUB_DOMAIN: 4 })).await;
    mount_empty_destination_transfers(&indexer).await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));

    poll_transfers(&ctx).await.expect("ingestion cycle should succeed");

    let hub = HUB_DOMAIN.to_string();
    assert_eq!(ctx.store.missing_nonces(&hub, 0, 10).await, vec![2]);
    assert_eq!(ctx.store.latest_nonce(&hub).await, Some(4));

    let pending = ctx
        .store
        .pending_transfers(&hub, &SPOKE_DOMAIN.to_string(), 10)
        .await;
    let nonces: Vec<u64> = pending.iter().map(|t| t.nonce).collect();
    assert_eq!(nonces, vec![0, 1, 3, 4]);
}

/// What is tested: a window whose first observed nonce sits above the
/// query floor records no gaps below it
/// Why: nonces under the observed range were never emitted; queuing them
/// for backfill would pollute the gap set with entries that cannot resolve
#[tokio::test]
async fn test_poll_records_no_gaps_below_observed_range() {
    let indexer = MockServer::start().await;
    mount_block_numbers(&indexer, json!({ HUB_DOMAIN: 100, SPOKE_DOMAIN: 100 })).await;
    mount_origin_transfers(&indexer, &[make_transfer(5)], json!({ HUB_DOMAIN: 5 })).await;
    mount_empty_destination_transfers(&indexer).await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));

    poll_transfers(&ctx).await.expect("ingestion cycle should succeed");

    let hub = HUB_DOMAIN.to_string();
    assert!(ctx.store.missing_nonces(&hub, 0, 10).await.is_empty());
    assert_eq!(ctx.store.latest_nonce(&hub).await, Some(5));
}

/// What is tested: backfill re-queries the gap set and removes resolved
/// nonces, storing the recovered transfer
/// Why: gaps must drain once the indexer catches up
#[tokio::test]
async fn test_backfill_resolves_missing_nonce() {
    let indexer = MockServer::start().await;
    let recovered = make_transfer(2);
    mount_transfers_by_nonces(&indexer, std::slice::from_ref(&recovered)).await;
    mount_empty_destination_transfers(&indexer).await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));
    let hub = HUB_DOMAIN.to_string();
    ctx.store.add_missing_nonces(&hub, &[2]).await;

    backfill_missing(&ctx).await.expect("backfill cycle should succeed");

    assert!(ctx.store.missing_nonces(&hub, 0, 10).await.is_empty());
    let stored = ctx
        .store
        .transfer(&recovered.transfer_id)
        .await
        .expect("recovered transfer should be stored");
    assert_eq!(stored.nonce, 2);
    assert_eq!(stored.status, TransferStatus::Pending);
}

/// What is tested: unresolved nonces stay in the gap set after a backfill
/// cycle that finds nothing
/// Why: a gap is only cleared by an actual indexer result
#[tokio::test]
async fn test_backfill_keeps_unresolved_nonces() {
    let indexer = MockServer::start().await;
    mount_transfers_by_nonces(&indexer, &[]).await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));
    let hub = HUB_DOMAIN.to_string();
    ctx.store.add_missing_nonces(&hub, &[2, 5]).await;

    backfill_missing(&ctx).await.expect("backfill cycle should succeed");

    assert_eq!(ctx.store.missing_nonces(&hub, 0, 10).await, vec![2, 5]);
}

/// What is tested: a domain the indexer reports no block height for is
/// skipped for the cycle without failing it
/// Why: one lagging indexer must not stall ingestion on other domains
#[tokio::test]
async fn test_poll_skips_domain_without_block_number() {
    let indexer = MockServer::start().await;
    mount_block_numbers(&indexer, json!({ SPOKE_DOMAIN: 100 })).await;
    mount_origin_transfers(&indexer, &[], json!({})).await;
    mount_empty_destination_transfers(&indexer).await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));

    poll_transfers(&ctx).await.expect("ingestion cycle should succeed");

    assert_eq!(ctx.store.latest_nonce(&HUB_DOMAIN.to_string()).await, None);
}

/// What is tested: a transfer destined for an unconfigured domain is not
/// cached, while its nonce still advances the cursor
/// Why: the agent cannot prove against domains it has no deployments for,
/// but the origin sequence accounting must stay intact
#[tokio::test]
async fn test_unconfigured_destination_is_dropped() {
    let indexer = MockServer::start().await;
    let mut foreign = make_transfer(0);
    foreign.destination_domain = UNCONFIGURED_DOMAIN.to_string();
    let local = make_transfer(1);
    mount_block_numbers(&indexer, json!({ HUB_DOMAIN: 100, SPOKE_DOMAIN: 100 })).await;
    mount_origin_transfers(
        &indexer,
        &[foreign.clone(), local.clone()],
        json!({ HUB_DOMAIN: 1 }),
    )
    .await;
    mount_empty_destination_transfers(&indexer).await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));

    poll_transfers(&ctx).await.expect("ingestion cycle should succeed");

    assert!(ctx.store.transfer(&foreign.transfer_id).await.is_none());
    assert!(ctx.store.transfer(&local.transfer_id).await.is_some());
    assert_eq!(
        ctx.store.latest_nonce(&HUB_DOMAIN.to_string()).await,
        Some(1)
    );
}

/// What is tested: a destination-side record merges into the cached
/// transfer without resetting its status
/// Why: the destination observation completes the record, it does not
/// restart its lifecycle
#[tokio::test]
async fn test_destination_side_merge() {
    let indexer = MockServer::start().await;
    let origin_side = make_transfer(0);
    let mut destination_side = origin_side.clone();
    destination_side.destination_tx_hash = Some("0xdest".to_string());

    mount_block_numbers(&indexer, json!({ HUB_DOMAIN: 100, SPOKE_DOMAIN: 100 })).await;
    mount_origin_transfers(
        &indexer,
        std::slice::from_ref(&origin_side),
        json!({ HUB_DOMAIN: 0 }),
    )
    .await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/destination-transfers"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(json!({ "transfers": [destination_side] })),
        )
        .mount(&indexer)
        .await;

    let ctx = build_test_context(build_test_config(
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
        &indexer.uri(),
    ));

    poll_transfers(&ctx).await.expect("ingestion cycle should succeed");

    let stored = ctx
        .store
        .transfer(&origin_side.transfer_id)
        .await
        .expect("transfer should be stored");
    assert_eq!(stored.destination_tx_hash.as_deref(), Some("0xdest"));
    assert_eq!(stored.status, TransferStatus::Pending);
}
