//! Prune Task
//!
//! Background task that periodically removes expired cache entries, bounding
//! memory held by entries that expire without ever being looked up again.

use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{Cache, Clock};

/// Spawns a background task that periodically prunes expired cache entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between sweeps.
/// It holds a clone of the cache handle, so the cache stays alive until the
/// task is aborted.
///
/// # Arguments
/// * `cache` - Handle to the cache to sweep
/// * `interval` - Time between prune runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache: Cache<String, String> = Cache::new(Duration::from_secs(300));
/// let prune_handle = spawn_prune_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// prune_handle.abort();
/// ```
pub fn spawn_prune_task<K, V, C>(cache: Cache<K, V, C>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    tokio::spawn(async move {
        info!(?interval, "Starting prune task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.prune();

            if removed > 0 {
                info!("Prune: removed {} expired entries", removed);
            } else {
                debug!("Prune: no expired entries found");
            }
        }
    })
}
