//! Memo Cache - An in-memory memoization cache
//!
//! Provides key-value storage with per-entry TTL expiration and stampede
//! prevention: concurrent requests for a missing key share a single
//! computation of its value.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{ttl_from_millis, CacheError};
pub use tasks::spawn_prune_task;
