// tests/fetch_cache.rs
//
// Fetch cache behavior under a paused tokio clock:
// - TTL freshness (hit before expiry, refetch after)
// - single-flight: concurrent callers share one fetch, value or error
// - failures are never stored; a stale entry survives a failed refresh
// - timeout releases the in-flight slot
// - capacity eviction removes the oldest insertion first

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use related_news::cache::{CacheKey, CacheOptions, ContentFetchCache};
use related_news::FetchError;

const TTL: Duration = Duration::from_secs(60);

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Fetch that counts its invocations and returns `value` after `delay`.
async fn counted(
    calls: Arc<AtomicUsize>,
    delay: Duration,
    value: Result<String, FetchError>,
) -> Result<String, FetchError> {
    calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(delay).await;
    value
}

#[tokio::test(start_paused = true)]
async fn entry_is_fresh_until_ttl_then_refetched() {
    let cache: ContentFetchCache<String> = ContentFetchCache::default();
    let key = CacheKey::raw("front-page");
    let calls = counter();

    let c = calls.clone();
    let v0 = cache
        .get_or_fetch(&key, TTL, move || counted(c, Duration::ZERO, Ok("A".into())))
        .await
        .unwrap();
    assert_eq!(*v0, "A");

    tokio::time::advance(Duration::from_secs(30)).await;
    let c = calls.clone();
    let v30 = cache
        .get_or_fetch(&key, TTL, move || counted(c, Duration::ZERO, Ok("B".into())))
        .await
        .unwrap();
    assert_eq!(*v30, "A", "t=30 must be served from cache");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    let c = calls.clone();
    let v61 = cache
        .get_or_fetch(&key, TTL, move || counted(c, Duration::ZERO, Ok("B".into())))
        .await
        .unwrap();
    assert_eq!(*v61, "B", "t=61 must trigger a new fetch");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_fetch() {
    let cache: ContentFetchCache<String> = ContentFetchCache::default();
    let key = CacheKey::raw("article:senate-race");
    let calls = counter();

    let (c1, c2) = (calls.clone(), calls.clone());
    let (a, b) = tokio::join!(
        cache.get_or_fetch(&key, TTL, move || counted(
            c1,
            Duration::from_millis(200),
            Ok("A".into())
        )),
        cache.get_or_fetch(&key, TTL, move || counted(
            c2,
            Duration::from_millis(200),
            Ok("other".into())
        )),
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a, &b), "both callers get the very same value");

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.coalesced, 1);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.entries, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_the_error_and_it_is_not_stored() {
    let cache: ContentFetchCache<String> = ContentFetchCache::default();
    let key = CacheKey::raw("pool");
    let calls = counter();

    let (c1, c2) = (calls.clone(), calls.clone());
    let (a, b) = tokio::join!(
        cache.get_or_fetch(&key, TTL, move || counted(
            c1,
            Duration::from_millis(50),
            Err(FetchError::Status(503))
        )),
        cache.get_or_fetch(&key, TTL, move || counted(
            c2,
            Duration::from_millis(50),
            Ok("unused".into())
        )),
    );
    assert_eq!(a.unwrap_err(), FetchError::Status(503));
    assert_eq!(b.unwrap_err(), FetchError::Status(503));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().errors, 1);
    assert!(cache.is_empty());

    // next call retries immediately
    let c = calls.clone();
    let v = cache
        .get_or_fetch(&key, TTL, move || counted(c, Duration::ZERO, Ok("ok".into())))
        .await
        .unwrap();
    assert_eq!(*v, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_stale_entry_but_never_serves_it_as_fresh() {
    let cache: ContentFetchCache<String> = ContentFetchCache::default();
    let key = CacheKey::raw("pool");
    let calls = counter();
    let ttl = Duration::from_secs(10);

    let c = calls.clone();
    cache
        .get_or_fetch(&key, ttl, move || counted(c, Duration::ZERO, Ok("old".into())))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(11)).await;
    let c = calls.clone();
    let err = cache
        .get_or_fetch(&key, ttl, move || {
            counted(c, Duration::ZERO, Err(FetchError::Transport("reset".into())))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
    assert_eq!(cache.len(), 1, "stale entry stays in place");
    assert!(cache.get(&key).is_none(), "stale entry is not fresh");

    let c = calls.clone();
    let v = cache
        .get_or_fetch(&key, ttl, move || counted(c, Duration::ZERO, Ok("new".into())))
        .await
        .unwrap();
    assert_eq!(*v, "new");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn timeout_releases_the_in_flight_slot() {
    let cache: ContentFetchCache<String> = ContentFetchCache::new(CacheOptions {
        fetch_timeout: Duration::from_secs(1),
        max_entries: None,
    });
    let key = CacheKey::raw("slow");
    let calls = counter();

    let c = calls.clone();
    let err = cache
        .get_or_fetch(&key, TTL, move || {
            counted(c, Duration::from_secs(5), Ok("late".into()))
        })
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout(Duration::from_secs(1)));
    assert_eq!(cache.stats().in_flight, 0);
    assert!(cache.is_empty());

    let c = calls.clone();
    let v = cache
        .get_or_fetch(&key, TTL, move || counted(c, Duration::ZERO, Ok("fast".into())))
        .await
        .unwrap();
    assert_eq!(*v, "fast");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn capacity_evicts_oldest_insertion_first() {
    let cache: ContentFetchCache<String> = ContentFetchCache::new(CacheOptions {
        max_entries: Some(2),
        ..CacheOptions::default()
    });

    for name in ["a", "b", "c"] {
        let value = name.to_string();
        cache
            .get_or_fetch(&CacheKey::raw(name), TTL, move || async move { Ok(value) })
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
    }

    assert_eq!(cache.len(), 2);
    assert!(cache.get(&CacheKey::raw("a")).is_none());
    assert!(cache.get(&CacheKey::raw("b")).is_some());
    assert!(cache.get(&CacheKey::raw("c")).is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn per_call_ttl_applies_to_each_key() {
    let cache: ContentFetchCache<String> = ContentFetchCache::default();
    let breaking = CacheKey::raw("breaking");
    let pool = CacheKey::raw("pool");

    cache
        .get_or_fetch(&breaking, Duration::from_secs(60), || async { Ok("b".to_string()) })
        .await
        .unwrap();
    cache
        .get_or_fetch(&pool, Duration::from_secs(600), || async { Ok("p".to_string()) })
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(120)).await;
    assert!(cache.get(&breaking).is_none());
    assert!(cache.get(&pool).is_some());
}
