//! End-to-end tests of the qualification pipeline against mock
//! collaborators: seen-set monotonicity, gate ordering, boundary
//! behaviour, and forward progress across batches.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use callsign::pipeline::{Qualifier, QualifierConfig};
use callsign::store::{CallStore, MemoryStore};
use support::{bundled_risk, high_creator_risk, MockFeed, MockMarket, MockRisk};

fn fast_config() -> QualifierConfig {
    QualifierConfig {
        risk_check_delay: Duration::ZERO,
        refetch_backoff: Duration::ZERO,
        ..Default::default()
    }
}

fn build(
    feed: MockFeed,
    risk: MockRisk,
    market: MockMarket,
) -> (
    Qualifier<MockFeed, MockRisk, MockMarket, MemoryStore>,
    Arc<MockFeed>,
    Arc<MockRisk>,
    Arc<MockMarket>,
    Arc<MemoryStore>,
) {
    let feed = Arc::new(feed);
    let risk = Arc::new(risk);
    let market = Arc::new(market);
    let store = Arc::new(MemoryStore::new());
    let qualifier = Qualifier::new(
        feed.clone(),
        risk.clone(),
        market.clone(),
        store.clone(),
        fast_config(),
    );
    (qualifier, feed, risk, market, store)
}

#[tokio::test]
async fn accepted_mint_is_never_reevaluated() {
    // The same mint keeps resurfacing in the feed; after acceptance it
    // must be invisible to later invocations.
    let feed = MockFeed::new(vec![vec!["MintA"], vec!["MintA", "MintB"]]);
    let risk = MockRisk::new();
    let market = MockMarket::new();
    market.set_cap("MintA", 30_000.0);
    market.set_cap("MintB", 30_000.0);

    let (qualifier, _, risk, _, store) = build(feed, risk, market);
    let token = CancellationToken::new();

    let first = qualifier.next_call(&token).await.unwrap().unwrap();
    assert_eq!(first.mint, "MintA");

    let second = qualifier.next_call(&token).await.unwrap().unwrap();
    assert_eq!(second.mint, "MintB");

    // MintA was assessed exactly once, in the first invocation.
    assert_eq!(
        risk.assessed_mints()
            .iter()
            .filter(|m| m.as_str() == "MintA")
            .count(),
        1
    );
    assert_eq!(store.tracked_count().await.unwrap(), 2);
}

#[tokio::test]
async fn exactly_one_acceptance_per_invocation() {
    // Both candidates qualify; only the first is taken and persisted.
    let feed = MockFeed::new(vec![vec!["First", "Second"]]);
    let risk = MockRisk::new();
    let market = MockMarket::new();
    market.set_cap("First", 25_000.0);
    market.set_cap("Second", 99_000.0);

    let (qualifier, _, _, market, store) = build(feed, risk, market);
    let call = qualifier
        .next_call(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(call.mint, "First");
    assert_eq!(store.tracked_mints().await.unwrap(), vec!["First"]);
    assert_eq!(market.fetched_mints(), vec!["First"]);
}

#[tokio::test]
async fn risk_rejection_skips_market_fetch() {
    // 60% bundled → rejected before any market call is made for it.
    let feed = MockFeed::new(vec![vec!["Bundled", "Clean"]]);
    let risk = MockRisk::new();
    risk.set("Bundled", bundled_risk(60.0));
    let market = MockMarket::new();
    market.set_cap("Clean", 21_000.0);

    let (qualifier, _, _, market, _) = build(feed, risk, market);
    let call = qualifier
        .next_call(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(call.mint, "Clean");
    assert_eq!(market.fetched_mints(), vec!["Clean"]);
}

#[tokio::test]
async fn market_cap_floor_is_strict() {
    // Exactly 20,000 passes; 19,999.99 is rejected.
    let feed = MockFeed::new(vec![vec!["JustUnder", "AtFloor"]]);
    let risk = MockRisk::new();
    let market = MockMarket::new();
    market.set_cap("JustUnder", 19_999.99);
    market.set_cap("AtFloor", 20_000.0);

    let (qualifier, _, _, _, store) = build(feed, risk, market);
    let call = qualifier
        .next_call(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(call.mint, "AtFloor");
    assert!(!store.is_tracked("JustUnder").await.unwrap());
}

#[tokio::test]
async fn keeps_polling_through_empty_batches() {
    let feed = MockFeed::new(vec![vec![], vec![], vec!["Late"]]);
    let risk = MockRisk::new();
    let market = MockMarket::new();
    market.set_cap("Late", 40_000.0);

    let (qualifier, feed, _, _, _) = build(feed, risk, market);
    let call = qualifier
        .next_call(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(call.mint, "Late");
    assert_eq!(feed.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fully_rejected_batch_triggers_refetch() {
    let feed = MockFeed::new(vec![vec!["Risky", "Tiny"], vec!["Winner"]]);
    let risk = MockRisk::new();
    risk.set("Risky", high_creator_risk());
    let market = MockMarket::new();
    market.set_cap("Tiny", 500.0);
    market.set_cap("Winner", 22_000.0);

    let (qualifier, feed, _, _, store) = build(feed, risk, market);
    let call = qualifier
        .next_call(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(call.mint, "Winner");
    assert_eq!(feed.polls.load(Ordering::SeqCst), 2);
    // Neither reject made it into the store.
    assert_eq!(store.tracked_count().await.unwrap(), 1);
}

#[tokio::test]
async fn accepted_call_carries_merged_record() {
    let feed = MockFeed::new(vec![vec!["MintA"]]);
    let risk = MockRisk::new();
    risk.set("MintA", bundled_risk(15.7));
    let market = MockMarket::new();
    market.set_cap("MintA", 24_850.0);

    let (qualifier, _, _, _, store) = build(feed, risk, market);
    let call = qualifier
        .next_call(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(call.record.market.current_market_cap, 24_850.0);
    assert_eq!(call.record.risk.total_percentage_bundled, 15.7);

    // The persisted record matches the returned one.
    let stored = store.load_record("MintA").await.unwrap().unwrap();
    assert_eq!(stored.market.current_market_cap, 24_850.0);
    assert_eq!(stored.risk.total_percentage_bundled, 15.7);
}

#[tokio::test]
async fn feed_failure_aborts_cycle() {
    let feed = MockFeed::new(vec![]);
    feed.set_error("upstream 503");
    let (qualifier, ..) = build(feed, MockRisk::new(), MockMarket::new());

    assert!(qualifier
        .next_call(&CancellationToken::new())
        .await
        .is_err());
}

#[tokio::test]
async fn cancellation_stops_before_polling() {
    let feed = MockFeed::new(vec![vec!["MintA"]]);
    let (qualifier, feed, _, _, store) = build(feed, MockRisk::new(), MockMarket::new());

    let token = CancellationToken::new();
    token.cancel();

    let result = qualifier.next_call(&token).await.unwrap();
    assert!(result.is_none());
    assert_eq!(feed.polls.load(Ordering::SeqCst), 0);
    assert_eq!(store.tracked_count().await.unwrap(), 0);
}
