//! Cache Store Module
//!
//! Sharded key/entry storage with lazy expiration and a pruning sweep.

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::cache::CacheEntry;

// == Lookup ==
/// Result of reading a key from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup<V> {
    /// A live entry was found
    Hit(V),
    /// No entry for the key
    Miss,
    /// An expired entry was found and evicted
    Expired,
}

impl<V> Lookup<V> {
    pub(crate) fn into_value(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Expired => None,
        }
    }
}

// == Store ==
/// Key to entry mapping. Each shard is locked independently, so operations
/// on different keys rarely contend.
#[derive(Debug)]
pub(crate) struct Store<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    // == Get ==
    /// Reads a live value, evicting the entry if it has expired as of `now`.
    pub(crate) fn get<Q>(&self, key: &Q, now: Instant) -> Lookup<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Lookup::Hit(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        // The shard guard is released above; a writer may have replaced the
        // stale entry since, so only remove it if it is still stale.
        if expired
            && self
                .entries
                .remove_if(key, |_, entry| entry.is_expired(now))
                .is_some()
        {
            Lookup::Expired
        } else {
            Lookup::Miss
        }
    }

    // == Insert ==
    /// Stores `value` expiring `ttl` after `now`, replacing any prior entry.
    pub(crate) fn insert(&self, key: K, value: V, now: Instant, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, now, ttl));
    }

    // == Remove ==
    pub(crate) fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).is_some()
    }

    // == Time To Live ==
    /// Remaining lifetime of a live entry.
    pub(crate) fn ttl_remaining<Q>(&self, key: &Q, now: Instant) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining(now))
    }

    // == Prune ==
    /// Removes every entry expired as of `now` and returns how many went.
    pub(crate) fn prune(&self, now: Instant) -> usize {
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
