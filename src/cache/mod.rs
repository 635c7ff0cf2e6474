//! Cache Module
//!
//! Provides an in-memory memoization cache with TTL expiration and
//! single-flight computation of missing values.

mod clock;
mod engine;
mod entry;
mod pending;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::Cache;
pub use entry::CacheEntry;
pub use stats::CacheStats;
