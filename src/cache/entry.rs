//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value with its absolute expiration instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant at which the entry becomes stale
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now`.
    ///
    /// A TTL too large to represent saturates to a far-future instant rather
    /// than wrapping into the past.
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| far_future(now));

        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`, so a
    /// zero TTL yields an entry that is already stale on the next lookup.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining time before expiry, zero once expired.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

// ~30 years; Instant has no MAX constant.
fn far_future(now: Instant) -> Instant {
    let mut span = Duration::from_secs(60 * 60 * 24 * 365 * 30);
    loop {
        if let Some(at) = now.checked_add(span) {
            return at;
        }
        span /= 2;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_live_before_ttl() {
        let now = Instant::now();
        let entry = CacheEntry::new("v", now, Duration::from_secs(60));

        assert_eq!(entry.value, "v");
        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + Duration::from_secs(59)));
    }

    #[test]
    fn test_entry_expired_after_ttl() {
        let now = Instant::now();
        let entry = CacheEntry::new("v", now, Duration::from_millis(100));

        assert!(entry.is_expired(now + Duration::from_millis(150)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry::new(1, now, Duration::from_millis(100));

        assert!(entry.is_expired(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_stale() {
        let now = Instant::now();
        let entry = CacheEntry::new(1, now, Duration::ZERO);

        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = CacheEntry::new(1, now, Duration::from_secs(10));

        assert_eq!(entry.ttl_remaining(now), Duration::from_secs(10));
        assert_eq!(
            entry.ttl_remaining(now + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            entry.ttl_remaining(now + Duration::from_secs(11)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let now = Instant::now();
        let entry = CacheEntry::new(1, now, Duration::MAX);

        assert!(entry.expires_at > now);
        assert!(!entry.is_expired(now));
    }
}
