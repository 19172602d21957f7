//! In-Flight Group Module
//!
//! Per-key registry of in-flight handler executions for request coalescing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::trace;

use crate::error::CallError;
use crate::key::CacheKey;

// == Result Slot ==
/// Broadcast slot for one execution: empty until the leader publishes.
type ResultSlot<V> = Option<Result<V, CallError>>;

// == Flight Roles ==
/// Role handed to a caller joining the registry for a key.
pub(crate) enum Flight<V> {
    /// No execution was in flight; this caller runs the handler and must
    /// publish the outcome through the guard.
    Leader(LeaderGuard<V>),
    /// An execution is already in flight; await the shared slot.
    Follower(watch::Receiver<ResultSlot<V>>),
}

// == Flight Registry ==
/// Tracks at most one in-flight execution per key.
///
/// Groups are short-lived: created when the first caller for a key arrives,
/// destroyed when the leader publishes or disappears. The registry lock only
/// guards the map itself; it is never held across an await point.
pub(crate) struct FlightRegistry<V> {
    groups: Mutex<HashMap<CacheKey, watch::Receiver<ResultSlot<V>>>>,
}

impl<V> FlightRegistry<V> {
    // == Constructor ==
    pub(crate) fn new() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
        }
    }

    // == Join ==
    /// Joins the group for `key`, creating it when none is in flight.
    ///
    /// Exactly one caller per group observes [`Flight::Leader`]; everyone
    /// else overlapping that execution becomes a follower on the same slot.
    pub(crate) fn join(self: &Arc<Self>, key: CacheKey) -> Flight<V> {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(rx) = groups.get(&key) {
            trace!(%key, "joined in-flight group as follower");
            return Flight::Follower(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        groups.insert(key.clone(), rx);
        trace!(%key, "opened in-flight group as leader");

        Flight::Leader(LeaderGuard {
            key,
            tx,
            registry: Arc::clone(self),
            done: false,
        })
    }

    // == Depart ==
    /// Removes the group for `key`, releasing the slot for future leaders.
    fn depart(&self, key: &CacheKey) {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        groups.remove(key);
    }

    /// Number of groups currently in flight.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// == Leader Guard ==
/// Exclusive right (and obligation) to publish a group's outcome.
///
/// Dropping the guard without publishing tears the group down and closes the
/// channel, which followers treat as "leader vanished, retry". That keeps a
/// cancelled leader from wedging every waiter on its key.
pub(crate) struct LeaderGuard<V> {
    key: CacheKey,
    tx: watch::Sender<ResultSlot<V>>,
    registry: Arc<FlightRegistry<V>>,
    done: bool,
}

impl<V> LeaderGuard<V> {
    // == Finish ==
    /// Publishes the shared outcome and tears the group down.
    ///
    /// The group is removed from the registry before the broadcast: late
    /// arrivals re-check the store (which the leader has already populated
    /// on success) or start a fresh group, while existing followers still
    /// observe the value through their receivers.
    pub(crate) fn finish(mut self, result: Result<V, CallError>) {
        self.registry.depart(&self.key);
        self.done = true;
        let _ = self.tx.send(Some(result));
    }
}

impl<V> Drop for LeaderGuard<V> {
    fn drop(&mut self) {
        if !self.done {
            trace!(key = %self.key, "leader dropped without publishing");
            self.registry.depart(&self.key);
        }
    }
}
