//! Pending Computation Registry
//!
//! Tracks the computations currently in flight so that concurrent callers
//! for the same key attach to one shared future instead of starting their own.

use std::any::Any;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::{Entry, VacantEntry};
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

/// A computation that any number of callers can await.
pub(crate) type Computation<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// The outcome of a computation with its error type erased.
///
/// Resolves to `None` when the computation failed.
pub(crate) type Settled<V> = Shared<BoxFuture<'static, Option<V>>>;

// == Pending Slot ==
/// Registry entry for one in-flight computation.
pub(crate) struct PendingSlot<V> {
    /// Distinguishes this flight from any later one for the same key
    id: u64,
    /// The leader's `Computation<V, E>`, typed by whatever `E` it was started with
    computation: Box<dyn Any + Send + Sync>,
    /// The same computation viewed without its error type
    settled: Settled<V>,
}

// == Flight ==
/// What a caller should do after consulting the registry for a key.
pub(crate) enum Flight<'a, K, V, E> {
    /// A live value turned up while the registry was locked
    Hit(V),
    /// Another caller is computing with the same error type; share its outcome
    Join(Computation<V, E>),
    /// Another caller is computing with a different error type; only its
    /// success can be shared
    Settle(Settled<V>),
    /// Nobody is computing; the holder of this entry becomes the leader
    Vacant(VacantEntry<'a, K, PendingSlot<V>>),
}

// == Pending Registry ==
pub(crate) struct PendingRegistry<K, V>
where
    K: Eq + Hash,
{
    slots: DashMap<K, PendingSlot<V>>,
    next_id: AtomicU64,
}

impl<K, V> PendingRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    // == Begin ==
    /// Looks up the in-flight computation for `key`.
    ///
    /// `recheck` runs while the key's registry shard is locked and only when
    /// no computation is in flight. A value it returns short-circuits the
    /// flight: it catches a computation that completed between the caller's
    /// first store lookup and this call.
    pub(crate) fn begin<E>(
        &self,
        key: &K,
        recheck: impl FnOnce() -> Option<V>,
    ) -> Flight<'_, K, V, E>
    where
        E: Clone + Send + Sync + 'static,
    {
        match self.slots.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                let slot = occupied.get();
                match slot.computation.downcast_ref::<Computation<V, E>>() {
                    Some(computation) => Flight::Join(computation.clone()),
                    None => Flight::Settle(slot.settled.clone()),
                }
            }
            Entry::Vacant(slot) => match recheck() {
                Some(value) => Flight::Hit(value),
                None => Flight::Vacant(slot),
            },
        }
    }

    // == Install ==
    /// Claims a vacant slot with a new flight id, registering the computation
    /// `start` builds for that id.
    pub(crate) fn install<E>(
        &self,
        slot: VacantEntry<'_, K, PendingSlot<V>>,
        start: impl FnOnce(u64) -> BoxFuture<'static, Result<V, E>>,
    ) -> Computation<V, E>
    where
        E: Clone + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let computation = start(id).shared();
        let settled = computation.clone().map(Result::ok).boxed().shared();

        slot.insert(PendingSlot {
            id,
            computation: Box::new(computation.clone()),
            settled,
        });

        computation
    }

    // == Finish ==
    /// Removes the slot for `key` if it still belongs to flight `id`.
    pub(crate) fn finish(&self, key: &K, id: u64) -> bool {
        self.slots.remove_if(key, |_, slot| slot.id == id).is_some()
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
