// src/cache/mod.rs
//! # Content fetch cache
//! Time-bounded, single-flight cache in front of the content API.
//!
//! - Fresh entry (`now < inserted_at + ttl`) → returned without a call.
//! - Fetch already in flight for the key → the caller joins it and gets the
//!   very same result, value or error.
//! - Missing or stale entry → one new fetch, bounded by `fetch_timeout`.
//! - Failures are never stored; a previous stale entry stays in place so a
//!   later request can try again.
//! - Over `max_entries`, the oldest insertion is evicted first.
//!
//! All bookkeeping sits behind one `std::sync::Mutex` that is never held
//! across an `.await`. Values are published as complete `Arc`s, so readers
//! see either the old value or the new one.

pub mod key;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use key::CacheKey;

use crate::error::FetchError;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_ENTRIES: usize = 512;

type FetchResult<V> = Result<Arc<V>, FetchError>;
type SharedFetch<V> = Shared<BoxFuture<'static, FetchResult<V>>>;

/// Construction-time knobs. TTLs are chosen per call, see `TtlPolicy`.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub fetch_timeout: Duration,
    /// `None` disables capacity eviction.
    pub max_entries: Option<usize>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_entries: Some(DEFAULT_MAX_ENTRIES),
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    ttl: Duration,
    /// Insertion order, used for eviction (instants can tie).
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.inserted_at + self.ttl
    }
}

struct InFlight<V> {
    id: u64,
    started: Instant,
    ttl: Duration,
    fut: SharedFetch<V>,
}

struct Slot<V> {
    entry: Option<CacheEntry<V>>,
    in_flight: Option<InFlight<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            entry: None,
            in_flight: None,
        }
    }
}

struct State<V> {
    slots: HashMap<CacheKey, Slot<V>>,
    next_seq: u64,
}

impl<V> State<V> {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn entry_count(&self) -> usize {
        self.slots.values().filter(|s| s.entry.is_some()).count()
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    errors: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time view for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub errors: u64,
    pub evictions: u64,
}

/// Process-wide cache; construct once and share via `Arc`.
pub struct ContentFetchCache<V = serde_json::Value> {
    state: Mutex<State<V>>,
    options: CacheOptions,
    counters: Counters,
}

impl<V> ContentFetchCache<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(options: CacheOptions) -> Self {
        Self {
            state: Mutex::new(State {
                slots: HashMap::new(),
                next_seq: 0,
            }),
            options,
            counters: Counters::default(),
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Return the fresh value for `key`, join an in-flight fetch, or run
    /// `fetch` and store its successful result for `ttl`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<Arc<V>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let (id, fut) = {
            let mut guard = self.lock();
            let now = Instant::now();
            let fresh_id = guard.bump();
            let slot = guard.slots.entry(key.clone()).or_default();

            if let Some(entry) = slot.entry.as_ref().filter(|e| e.is_fresh(now)) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                counter!("fetch_cache_hits_total").increment(1);
                debug!(target: "fetch_cache", %key, "hit");
                return Ok(entry.value.clone());
            }

            match slot
                .in_flight
                .as_ref()
                .filter(|f| now.duration_since(f.started) < self.options.fetch_timeout)
            {
                Some(flight) => {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    counter!("fetch_cache_coalesced_total").increment(1);
                    debug!(target: "fetch_cache", %key, "joining in-flight fetch");
                    (flight.id, flight.fut.clone())
                }
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    counter!("fetch_cache_misses_total").increment(1);
                    debug!(target: "fetch_cache", %key, stale = slot.entry.is_some(), "miss");

                    let fut = bounded(fetch(), self.options.fetch_timeout);
                    // Replaces an abandoned flight, if any.
                    slot.in_flight = Some(InFlight {
                        id: fresh_id,
                        started: now,
                        ttl,
                        fut: fut.clone(),
                    });
                    (fresh_id, fut)
                }
            }
        };

        let res = fut.await;
        self.settle(key, id, &res);
        res
    }

    /// Fresh value for `key`, without fetching.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        let guard = self.lock();
        let now = Instant::now();
        guard
            .slots
            .get(key)
            .and_then(|s| s.entry.as_ref())
            .filter(|e| e.is_fresh(now))
            .map(|e| e.value.clone())
    }

    /// Drop the stored value for `key`; an in-flight fetch is left alone.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut guard = self.lock();
        let Some(slot) = guard.slots.get_mut(key) else {
            return false;
        };
        let had = slot.entry.take().is_some();
        if slot.in_flight.is_none() {
            guard.slots.remove(key);
        }
        had
    }

    /// Drop every stored value. In-flight fetches still complete and store.
    pub fn clear(&self) {
        let mut guard = self.lock();
        guard.slots.retain(|_, s| {
            s.entry = None;
            s.in_flight.is_some()
        });
        gauge!("fetch_cache_entries").set(0.0);
    }

    /// Number of stored values, fresh or stale.
    pub fn len(&self) -> usize {
        self.lock().entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.lock();
        CacheStats {
            entries: guard.entry_count(),
            in_flight: guard.slots.values().filter(|s| s.in_flight.is_some()).count(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    /// Record the outcome of flight `id`. Every waiter calls this; only the
    /// first call for a given flight has an effect.
    fn settle(&self, key: &CacheKey, id: u64, res: &FetchResult<V>) {
        let mut guard = self.lock();
        let seq = guard.bump();
        let Some(slot) = guard.slots.get_mut(key) else {
            return;
        };
        let Some(flight) = slot.in_flight.take_if(|f| f.id == id) else {
            return;
        };

        match res {
            Ok(value) => {
                slot.entry = Some(CacheEntry {
                    value: value.clone(),
                    inserted_at: Instant::now(),
                    ttl: flight.ttl,
                    seq,
                });
                self.evict_over_capacity(&mut guard);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                counter!("fetch_cache_errors_total").increment(1);
                warn!(target: "fetch_cache", %key, error = %e, "fetch failed; not cached");
                if slot.entry.is_none() {
                    guard.slots.remove(key);
                }
            }
        }
        gauge!("fetch_cache_entries").set(guard.entry_count() as f64);
    }

    fn evict_over_capacity(&self, state: &mut State<V>) {
        let Some(max) = self.options.max_entries else {
            return;
        };
        while state.entry_count() > max {
            let oldest = state
                .slots
                .iter()
                .filter_map(|(k, s)| s.entry.as_ref().map(|e| (e.seq, k.clone())))
                .min();
            let Some((_, victim)) = oldest else {
                break;
            };
            if let Some(slot) = state.slots.get_mut(&victim) {
                slot.entry = None;
                if slot.in_flight.is_none() {
                    state.slots.remove(&victim);
                }
            }
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            counter!("fetch_cache_evictions_total").increment(1);
            debug!(target: "fetch_cache", key = %victim, "evicted oldest entry");
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<V>> {
        // State is only mutated in short non-panicking sections.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> Default for ContentFetchCache<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

/// Wrap a fetch in the timeout and make it shareable between waiters.
fn bounded<V, Fut>(fetch: Fut, timeout: Duration) -> SharedFetch<V>
where
    V: Send + Sync + 'static,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
{
    async move {
        let t0 = Instant::now();
        let out = match tokio::time::timeout(timeout, fetch).await {
            Ok(res) => res.map(Arc::new),
            Err(_) => Err(FetchError::Timeout(timeout)),
        };
        histogram!("content_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        out
    }
    .boxed()
    .shared()
}
