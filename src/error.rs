//! Error types for the memo cache
//!
//! Provides unified error handling using thiserror.
//!
//! Failures of a computation passed to `get_or_compute` are never mapped into
//! this type: they reach every caller as the computation's own error value.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache's own argument and configuration checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A TTL or interval was negative, malformed, or otherwise unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

// == Result Type Alias ==
/// Convenience Result type for the memo cache.
pub type Result<T> = std::result::Result<T, CacheError>;

// == TTL Conversion ==
/// Converts a signed millisecond count into a TTL.
///
/// Raw inputs (environment variables, wire payloads of callers) may carry a
/// negative number; those are rejected before they can reach the store.
pub fn ttl_from_millis(ms: i64) -> Result<Duration> {
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| CacheError::InvalidArgument(format!("TTL must not be negative, got {}ms", ms)))
}
