//! Memo Cache demo
//!
//! Fires a burst of concurrent lookups for the same slow value at a cache and
//! reports how many computations actually ran.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::{spawn_prune_task, Cache, CacheConfig};

/// Number of concurrent callers asking for the same key
const CALLERS: usize = 16;

/// Simulated latency of the expensive computation
const COMPUTE_LATENCY: Duration = Duration::from_millis(200);

/// Entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and start the background prune task
/// 4. Issue concurrent `get_or_compute` calls for one key
/// 5. Print cache statistics and stop the prune task
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("failed to load cache configuration")?;
    info!(
        "Configuration loaded: default_ttl={:?}, prune_interval={:?}",
        config.default_ttl, config.prune_interval
    );

    let cache: Cache<String, u64> = Cache::from_config(&config);
    let prune_handle = spawn_prune_task(cache.clone(), config.prune_interval);

    let runs = Arc::new(AtomicU64::new(0));
    let mut callers = Vec::with_capacity(CALLERS);

    for caller in 0..CALLERS {
        let cache = cache.clone();
        let runs = runs.clone();
        callers.push(tokio::spawn(async move {
            let value = cache
                .get_or_compute("report".to_string(), move || async move {
                    tokio::time::sleep(COMPUTE_LATENCY).await;
                    Ok::<_, String>(runs.fetch_add(1, Ordering::SeqCst) + 1)
                })
                .await;
            (caller, value)
        }));
    }

    for handle in callers {
        let (caller, value) = handle.await.context("caller task failed")?;
        let value = value.map_err(anyhow::Error::msg)?;
        info!("caller {} received {}", caller, value);
    }

    info!(
        "{} callers, {} computation(s) ran",
        CALLERS,
        runs.load(Ordering::SeqCst)
    );
    info!("stats: {}", serde_json::to_string(&cache.stats())?);

    prune_handle.abort();
    info!("Demo complete");

    Ok(())
}
