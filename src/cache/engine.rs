//! Cache Engine Module
//!
//! The public cache: TTL storage plus single-flight `get_or_compute`.

use std::borrow::Borrow;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, trace};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::pending::{Flight, PendingRegistry};
use crate::cache::stats::StatsRecorder;
use crate::cache::store::{Lookup, Store};
use crate::cache::CacheStats;
use crate::config::CacheConfig;

// == Cache ==
/// An in-memory cache with per-entry TTL and stampede prevention.
///
/// `Cache` is a handle: clones share the same entries and in-flight
/// computations, while separately constructed caches are fully independent.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use memo_cache::Cache;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache: Cache<String, u64> = Cache::new(Duration::from_secs(60));
///
/// let value = cache
///     .get_or_compute("answer".to_string(), || async { Ok::<_, String>(42) })
///     .await;
///
/// assert_eq!(value, Ok(42));
/// assert_eq!(cache.get("answer"), Some(42));
/// # }
/// ```
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash,
{
    inner: Arc<Inner<K, V, C>>,
}

struct Inner<K, V, C>
where
    K: Eq + Hash,
{
    store: Store<K, V>,
    pending: PendingRegistry<K, V>,
    default_ttl: Duration,
    clock: C,
    stats: StatsRecorder,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache whose entries live for `default_ttl` unless overridden.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL for entries written without an explicit override
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, SystemClock)
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.default_ttl)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Creates a cache that reads time from `clock`.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL for entries written without an explicit override
    /// * `clock` - Source of "now" for every expiry calculation
    pub fn with_clock(default_ttl: Duration, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Store::new(),
                pending: PendingRegistry::new(),
                default_ttl,
                clock,
                stats: StatsRecorder::default(),
            }),
        }
    }

    /// TTL applied when no override is given.
    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// An expired entry found here is removed. Computations in flight for the
    /// key are not consulted.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = &self.inner;
        match inner.store.get(key, inner.clock.now()) {
            Lookup::Hit(value) => {
                trace!("cache hit");
                inner.stats.record_hit();
                Some(value)
            }
            Lookup::Miss => {
                trace!("cache miss");
                inner.stats.record_miss();
                None
            }
            Lookup::Expired => {
                trace!("cache miss, evicted expired entry");
                inner.stats.record_miss();
                inner.stats.record_expired(1);
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key` with the default TTL, replacing any entry.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.inner.default_ttl);
    }

    /// Stores `value` under `key` for `ttl`, replacing any entry.
    ///
    /// A zero TTL is accepted; the entry is stale on its next lookup.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - How long the entry stays live, measured from now
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let inner = &self.inner;
        inner.store.insert(key, value, inner.clock.now(), ttl);
    }

    // == Delete ==
    /// Removes the entry for `key`. Returns whether one was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.remove(key)
    }

    // == Clear ==
    /// Removes every entry.
    ///
    /// Computations in flight keep running and store their result when done.
    pub fn clear(&self) {
        self.inner.store.clear();
        debug!("cache cleared");
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Time To Live ==
    /// Remaining lifetime of the live entry for `key`.
    pub fn ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = &self.inner;
        inner.store.ttl_remaining(key, inner.clock.now())
    }

    // == Prune ==
    /// Removes every expired entry and returns how many were removed.
    ///
    /// Computations in flight are not affected.
    pub fn prune(&self) -> usize {
        let inner = &self.inner;
        let removed = inner.store.prune(inner.clock.now());
        inner.stats.record_expired(removed);
        removed
    }

    // == In Flight ==
    /// Number of keys with a computation currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }

    /// Returns true while a computation for `key` is running.
    pub fn is_computing(&self, key: &K) -> bool {
        self.inner.pending.contains(key)
    }

    // == Stats ==
    /// Returns a snapshot of cache activity.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.len())
    }

    // == Get Or Compute ==
    /// Returns the live value for `key`, computing it with `compute` if
    /// there is none. The result is stored with the default TTL.
    ///
    /// See [`Cache::get_or_compute_with_ttl`].
    ///
    /// # Arguments
    /// * `key` - The key to look up and, on a miss, to store under
    /// * `compute` - Produces the value; runs at most once per miss
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Clone + Send + Sync + 'static,
    {
        self.get_or_compute_with_ttl(key, compute, self.inner.default_ttl)
            .await
    }

    /// Returns the live value for `key`, computing it with `compute` if
    /// there is none.
    ///
    /// At most one computation per key runs at a time. Callers arriving
    /// while one is in flight wait for it and receive the same outcome: the
    /// value, or a clone of the same error. A successful value is stored
    /// with an expiry of `ttl` after the computation completes; an error is
    /// never stored, so the next call computes afresh.
    ///
    /// The computation runs on its own tokio task, so it must be called from
    /// within a tokio runtime. Callers only wait on that task: a caller that
    /// is dropped or times out stops waiting, while the computation runs to
    /// completion, stores its value and releases its slot regardless.
    ///
    /// A waiter whose error type differs from the running computation's
    /// shares its value on success and starts its own computation on
    /// failure.
    ///
    /// # Arguments
    /// * `key` - The key to look up and, on a miss, to store under
    /// * `compute` - Produces the value; runs at most once per miss
    /// * `ttl` - Lifetime of a computed value, measured from completion
    pub async fn get_or_compute_with_ttl<F, Fut, E>(
        &self,
        key: K,
        compute: F,
        ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let inner = &self.inner;

        let computation = loop {
            if let Some(value) = self.get(&key) {
                return Ok(value);
            }

            let recheck = || inner.store.get(&key, inner.clock.now()).into_value();
            let settled = match inner.pending.begin::<E>(&key, recheck) {
                Flight::Hit(value) => return Ok(value),
                Flight::Join(computation) => {
                    debug!("joining computation already in flight");
                    inner.stats.record_coalesced();
                    break computation;
                }
                Flight::Settle(settled) => {
                    debug!("waiting on computation with a different error type");
                    inner.stats.record_coalesced();
                    settled
                }
                Flight::Vacant(slot) => {
                    debug!(?ttl, "starting computation");
                    inner.stats.record_computation();
                    let weak = Arc::downgrade(inner);
                    break inner.pending.install(slot, move |id| {
                        spawn_flight(run_flight(weak, key, id, compute, ttl))
                    });
                }
            };

            if let Some(value) = settled.await {
                return Ok(value);
            }
        };

        computation.await
    }
}

/// Runs a flight on its own task and returns a future for its outcome.
///
/// The task owns the computation, so it finishes even when every caller
/// waiting on it has gone away.
fn spawn_flight<V, E>(
    flight: impl Future<Output = Result<V, E>> + Send + 'static,
) -> BoxFuture<'static, Result<V, E>>
where
    V: Send + 'static,
    E: Send + 'static,
{
    let handle = tokio::spawn(flight);

    async move {
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => match err.try_into_panic() {
                Ok(panic) => std::panic::resume_unwind(panic),
                // Flight tasks are never aborted; only runtime shutdown gets here.
                Err(err) => panic!("computation task did not complete: {}", err),
            },
        }
    }
    .boxed()
}

/// Drives one computation and settles its bookkeeping before any caller
/// sees the outcome: a value is stored, and the pending slot is released on
/// success, failure, or panic alike.
async fn run_flight<K, V, C, F, Fut, E>(
    inner: Weak<Inner<K, V, C>>,
    key: K,
    id: u64,
    compute: F,
    ttl: Duration,
) -> Result<V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    let outcome = AssertUnwindSafe(async move { compute().await })
        .catch_unwind()
        .await;

    // The cache may have been dropped while the computation ran.
    let Some(inner) = inner.upgrade() else {
        return match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };
    };

    match outcome {
        Ok(Ok(value)) => {
            inner
                .store
                .insert(key.clone(), value.clone(), inner.clock.now(), ttl);
            inner.pending.finish(&key, id);
            debug!("computation stored its result");
            Ok(value)
        }
        Ok(Err(err)) => {
            inner.pending.finish(&key, id);
            inner.stats.record_failure();
            debug!("computation failed, nothing cached");
            Err(err)
        }
        Err(panic) => {
            inner.pending.finish(&key, id);
            inner.stats.record_failure();
            debug!("computation panicked, nothing cached");
            std::panic::resume_unwind(panic)
        }
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, C> std::fmt::Debug for Cache<K, V, C>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("default_ttl", &self.inner.default_ttl)
            .finish_non_exhaustive()
    }
}
