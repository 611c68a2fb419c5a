//! Integration tests for ImageResolver and ImageSession
//!
//! Time is paused so the inter-batch delay can be asserted exactly without
//! slowing the suite down.

mod common;

use pretty_assertions::assert_eq;
use shelfscope_core::ManualClock;
use shelfscope_images::{
    CACHE_STORAGE_KEY, ImageResolver, ImageResolverConfig, ImageSession, ImageSource,
};
use shelfscope_storage::{KeyValueStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

use common::{ApiCall, MockImageApi, ids};

const T0: i64 = 1_700_000_000_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

struct Harness {
    api: Arc<MockImageApi>,
    store: Arc<MemoryStore>,
    clock: ManualClock,
    resolver: ImageResolver,
    session: ImageSession,
}

fn harness(api: MockImageApi) -> Harness {
    let api = Arc::new(api);
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(T0);
    let resolver = ImageResolver::with_clock(
        api.clone(),
        store.clone(),
        Arc::new(clock.clone()),
        ImageResolverConfig::default(),
    );
    let session = resolver.session();
    Harness {
        api,
        store,
        clock,
        resolver,
        session,
    }
}

// ============ resolve_many ============

#[tokio::test(start_paused = true)]
async fn batches_of_five_with_one_second_between() {
    let all: Vec<String> = (0..12).map(|i| format!("ID{i:02}")).collect();
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let h = harness(MockImageApi::new().with_images(&refs));

    let start = tokio::time::Instant::now();
    let result = h.session.resolve_many(&all).await;

    let calls = h.api.timed_calls();
    let sizes: Vec<usize> = calls
        .iter()
        .map(|(_, call)| match call {
            ApiCall::Batch(batch) => batch.len(),
            ApiCall::One(_) => 1,
        })
        .collect();
    assert_eq!(sizes, vec![5, 5, 2]);

    let offsets: Vec<Duration> = calls.iter().map(|(at, _)| *at - start).collect();
    assert_eq!(
        offsets,
        vec![
            Duration::ZERO,
            Duration::from_millis(1000),
            Duration::from_millis(2000)
        ]
    );

    assert_eq!(result.urls.len(), 12);
    assert!(!result.loading);
    assert_eq!(result.error, None);
}

#[tokio::test(start_paused = true)]
async fn cached_entries_are_served_without_fetching() {
    let h = harness(MockImageApi::new().with_images(&["A", "B", "C"]));
    h.session.resolve_many(&ids(&["A", "B"])).await;
    assert_eq!(h.api.calls().len(), 1);

    let result = h.session.resolve_many(&ids(&["A", "B", "C"])).await;
    assert_eq!(
        h.api.calls().last(),
        Some(&ApiCall::Batch(ids(&["C"])))
    );
    assert_eq!(result.urls.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn cached_urls_are_published_before_network_returns() {
    let h = harness(
        MockImageApi::new()
            .with_images(&["A", "B"])
            .with_latency(Duration::from_secs(5)),
    );
    h.resolver.cache().put("A", "https://cdn.example/cached-a.jpg", "batch");

    let mut updates = h.session.subscribe();
    let wanted = ids(&["A", "B"]);
    let resolving = h.session.resolve_many(&wanted);
    tokio::pin!(resolving);

    // Drive the call until the first publish happens, then inspect it
    tokio::select! {
        _ = &mut resolving => panic!("should still be waiting on the network"),
        changed = updates.changed() => changed.unwrap(),
    }
    let first = updates.borrow_and_update().clone();
    assert!(first.loading);
    assert_eq!(
        first.urls.get("A").map(String::as_str),
        Some("https://cdn.example/cached-a.jpg")
    );
    assert!(!first.urls.contains_key("B"));

    let done = resolving.await;
    assert!(!done.loading);
    assert_eq!(done.urls.len(), 2);
    assert_eq!(h.session.current(), done);
}

#[tokio::test(start_paused = true)]
async fn failed_batch_degrades_to_individual_lookups() {
    let h = harness(
        MockImageApi::new()
            .with_images(&["A", "B", "C"])
            .with_batch_failure()
            .with_single_failure("B"),
    );

    let result = h.session.resolve_many(&ids(&["A", "B", "C"])).await;

    assert_eq!(
        h.api.calls(),
        vec![
            ApiCall::Batch(ids(&["A", "B", "C"])),
            ApiCall::One("A".into()),
            ApiCall::One("B".into()),
            ApiCall::One("C".into()),
        ]
    );
    let mut resolved: Vec<&str> = result.urls.keys().map(String::as_str).collect();
    resolved.sort();
    assert_eq!(resolved, vec!["A", "C"]);
    assert!(result.error.is_some());

    // Individually resolved entries are cached with the backend's method tag
    let entry = h.resolver.cache().get_valid("A").unwrap();
    assert_eq!(entry.method, "scrape");
    assert!(h.resolver.cache().get_valid("B").is_none());
}

#[tokio::test(start_paused = true)]
async fn backend_without_image_is_not_an_error() {
    let h = harness(MockImageApi::new().with_images(&["A"]));
    let result = h.session.resolve_many(&ids(&["A", "NOPE"])).await;

    assert_eq!(result.urls.len(), 1);
    assert_eq!(result.error, None);
    assert!(h.resolver.cache().get_valid("NOPE").is_none());
}

#[tokio::test(start_paused = true)]
async fn blank_and_duplicate_ids_are_ignored() {
    let h = harness(MockImageApi::new().with_images(&["A"]));
    h.session.resolve_many(&ids(&["A", " ", "A", "", " A "])).await;
    assert_eq!(h.api.calls(), vec![ApiCall::Batch(ids(&["A"]))]);
}

#[tokio::test(start_paused = true)]
async fn empty_input_makes_no_requests() {
    let h = harness(MockImageApi::new());
    let result = h.session.resolve_many(&[]).await;
    assert!(h.api.calls().is_empty());
    assert!(!result.loading);
    assert!(result.urls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn superseded_call_reports_what_it_left_unfetched() {
    let first_ids: Vec<String> = (0..10).map(|i| format!("OLD{i}")).collect();
    let refs: Vec<&str> = first_ids.iter().map(String::as_str).collect();
    let h = Arc::new(harness(
        MockImageApi::new()
            .with_images(&refs)
            .with_images(&["NEW"])
            .with_latency(Duration::from_millis(100)),
    ));

    let stale = {
        let h = h.clone();
        let first_ids = first_ids.clone();
        tokio::spawn(async move { h.session.resolve_many(&first_ids).await })
    };

    // Let the first batch go out, then supersede it on the same session
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fresh = h.session.resolve_many(&ids(&["NEW"])).await;
    let stale = stale.await.unwrap();

    // Visible state belongs to the newest call only
    assert_eq!(h.session.current(), fresh);
    assert_eq!(fresh.urls.len(), 1);
    assert_eq!(fresh.error, None);

    // The stale call finished its in-flight batch, cached it, then stopped
    // and said so instead of looking complete
    assert_eq!(stale.urls.len(), 5);
    assert!(!stale.loading);
    let error = stale.error.expect("superseded call must report an error");
    assert!(error.contains("5 product image(s)"), "{error}");
    assert!(h.resolver.cache().get_valid("OLD0").is_some());
    assert!(h.resolver.cache().get_valid("OLD9").is_none());
    let batches = h
        .api
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ApiCall::Batch(_)))
        .count();
    assert_eq!(batches, 2);
}

#[tokio::test(start_paused = true)]
async fn separate_sessions_do_not_interrupt_each_other() {
    let grid_ids: Vec<String> = (0..10).map(|i| format!("A{i}")).collect();
    let refs: Vec<&str> = grid_ids.iter().map(String::as_str).collect();
    let h = Arc::new(harness(
        MockImageApi::new()
            .with_images(&refs)
            .with_images(&["B0"])
            .with_latency(Duration::from_millis(100)),
    ));
    let grid = h.resolver.session();
    let detail = h.resolver.session();

    let grid_call = {
        let grid_ids = grid_ids.clone();
        tokio::spawn(async move {
            let batch = grid.resolve_many(&grid_ids).await;
            (batch, grid.current())
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let detail_batch = detail.resolve_many(&ids(&["B0"])).await;
    let (grid_batch, grid_current) = grid_call.await.unwrap();

    assert_eq!(grid_batch.urls.len(), 10);
    assert!(!grid_batch.loading);
    assert_eq!(grid_batch.error, None);
    assert_eq!(grid_current, grid_batch);

    assert_eq!(detail_batch.urls.len(), 1);
    assert_eq!(detail.current(), detail_batch);

    for id in grid_ids.iter().map(String::as_str).chain(["B0"]) {
        assert!(h.resolver.cache().get_valid(id).is_some(), "{id} not cached");
    }
    // The harness session was never used
    assert_eq!(h.session.current(), Default::default());
}

#[tokio::test(start_paused = true)]
async fn expired_entries_are_refetched() {
    let h = harness(MockImageApi::new().with_images(&["A"]));
    h.session.resolve_many(&ids(&["A"])).await;

    h.clock.set(T0 + DAY_MS - 1);
    h.session.resolve_many(&ids(&["A"])).await;
    assert_eq!(h.api.calls().len(), 1);

    h.clock.set(T0 + DAY_MS);
    h.session.resolve_many(&ids(&["A"])).await;
    assert_eq!(h.api.calls().len(), 2);
}

// ============ resolve_one ============

#[tokio::test]
async fn resolve_one_falls_back_when_network_fails() {
    let h = harness(MockImageApi::new().offline());

    let lookup = h.resolver.resolve_one("B08X").await;

    assert_eq!(lookup.source, ImageSource::Fallback);
    assert_eq!(
        lookup.url.as_deref(),
        Some("https://images-na.ssl-images-amazon.com/images/P/B08X.01.L.jpg")
    );
    assert!(lookup.error.is_some());
    assert!(!lookup.loading);
    // Fallback guesses are never cached
    assert!(h.store.get(CACHE_STORAGE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn resolve_one_uses_and_fills_cache() {
    let h = harness(MockImageApi::new().with_image("B08X", "https://cdn.example/real.jpg"));

    let first = h.resolver.resolve_one("B08X").await;
    assert_eq!(first.source, ImageSource::Network);
    assert_eq!(first.url.as_deref(), Some("https://cdn.example/real.jpg"));

    let second = h.resolver.resolve_one("B08X").await;
    assert_eq!(second.source, ImageSource::Cache);
    assert_eq!(h.api.calls(), vec![ApiCall::One("B08X".into())]);

    h.clock.advance(DAY_MS);
    let third = h.resolver.resolve_one("B08X").await;
    assert_eq!(third.source, ImageSource::Network);
    assert_eq!(h.api.calls().len(), 2);
}

#[tokio::test]
async fn resolve_one_signals_no_image() {
    let h = harness(MockImageApi::new());

    let missing = h.resolver.resolve_one("UNKNOWN").await;
    assert_eq!(missing.source, ImageSource::NoImage);
    assert_eq!(missing.url, None);
    assert_eq!(missing.error, None);

    let blank = h.resolver.resolve_one("  ").await;
    assert_eq!(blank.source, ImageSource::NoImage);
    assert_eq!(h.api.calls().len(), 1);
}
