//! Configuration Module
//!
//! Loads cache settings from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{ttl_from_millis, CacheError, Result};

/// Environment variable holding the default TTL in milliseconds
pub const DEFAULT_TTL_VAR: &str = "MEMO_DEFAULT_TTL_MS";
/// Environment variable holding the prune interval in milliseconds
pub const PRUNE_INTERVAL_VAR: &str = "MEMO_PRUNE_INTERVAL_MS";

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied to entries written without an explicit override
    pub default_ttl: Duration,
    /// Interval between background prune sweeps
    pub prune_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `MEMO_PRUNE_INTERVAL_MS` - Prune frequency in milliseconds (default: 1000)
    ///
    /// Unset variables fall back to the defaults. A variable that is set but
    /// not a non-negative integer is an error, as is a zero prune interval.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_ttl = read_millis(DEFAULT_TTL_VAR)?.unwrap_or(defaults.default_ttl);
        let prune_interval = read_millis(PRUNE_INTERVAL_VAR)?.unwrap_or(defaults.prune_interval);

        if prune_interval.is_zero() {
            return Err(CacheError::InvalidArgument(format!(
                "{} must be greater than zero",
                PRUNE_INTERVAL_VAR
            )));
        }

        Ok(Self {
            default_ttl,
            prune_interval,
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            prune_interval: Duration::from_secs(1),
        }
    }
}

fn read_millis(var: &str) -> Result<Option<Duration>> {
    let Ok(raw) = env::var(var) else {
        return Ok(None);
    };

    let ms: i64 = raw.trim().parse().map_err(|_| {
        CacheError::InvalidArgument(format!("{} is not an integer: {:?}", var, raw))
    })?;

    ttl_from_millis(ms).map(Some)
}
