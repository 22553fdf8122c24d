//! A process-lifetime, read-through memoizer with single-flight computation per key.
//!
//! Lifecycle: create once at startup, read through `get_or_compute`, never evict. The first
//! caller for a key runs the computation while later callers for the same key block until
//! it is published. Callers for different keys never wait on each other. Failures are
//! handed to every caller that was waiting on that attempt, then forgotten, so the next
//! caller retries.

use crate::PipelineError;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

type Value = Arc<dyn Any + Send + Sync>;

enum SlotState {
    Vacant,
    InFlight(u64),
    Ready(Value),
    Failed { attempt: u64, error: PipelineError },
}

struct Slot {
    state: Mutex<SlotState>,
    published: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self { state: Mutex::new(SlotState::Vacant), published: Condvar::new() }
    }

    fn publish(&self, state: SlotState) {
        *self.state.lock() = state;
        self.published.notify_all();
    }
}

/// Marks the attempt failed if the computation unwinds, so waiters are released.
struct Attempt<'a> {
    slot: &'a Slot,
    attempt: u64,
    settled: bool,
}

impl Attempt<'_> {
    fn settle(mut self, state: SlotState) {
        self.settled = true;
        self.slot.publish(state);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.slot.publish(SlotState::Failed {
                attempt: self.attempt,
                error: PipelineError::InvariantViolation(String::from("computation panicked")),
            });
        }
    }
}

pub struct ResultCache<K> {
    slots: Mutex<HashMap<K, Arc<Slot>>>,
    attempts: AtomicU64,
    computations: AtomicUsize,
}

impl<K: Eq + Hash + Clone + Debug> Default for ResultCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + Debug> ResultCache<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            attempts: AtomicU64::new(0),
            computations: AtomicUsize::new(0),
        }
    }

    /// Returns the value published under `key`, computing it with `compute` if there is none.
    ///
    /// # Returns
    /// * The shared value. If the computation fails, this caller and every caller that was
    ///   waiting on the same attempt receive the error. An `InvariantViolation` is returned if
    ///   `key` already holds a value of another type.
    pub fn get_or_compute<V, F>(&self, key: K, compute: F) -> Result<Arc<V>, PipelineError>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Result<V, PipelineError>,
    {
        let slot = self.slot(&key);
        let mut state = slot.state.lock();
        loop {
            match &*state {
                SlotState::Ready(value) => {
                    debug!(?key, "Using cached result");
                    return downcast(&key, value.clone());
                }
                SlotState::InFlight(attempt) => {
                    let attempt = *attempt;
                    debug!(?key, "Waiting for in-flight computation");
                    while matches!(&*state, SlotState::InFlight(a) if *a == attempt) {
                        slot.published.wait(&mut state);
                    }
                    if let SlotState::Failed { attempt: failed, error } = &*state {
                        if *failed == attempt {
                            return Err(error.clone());
                        }
                    }
                }
                SlotState::Vacant | SlotState::Failed { .. } => break,
            }
        }

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        *state = SlotState::InFlight(attempt);
        drop(state);

        self.computations.fetch_add(1, Ordering::Relaxed);
        debug!(?key, "Computing");
        let guard = Attempt { slot: &slot, attempt, settled: false };
        match compute() {
            Ok(value) => {
                let value: Value = Arc::new(value);
                guard.settle(SlotState::Ready(value.clone()));
                downcast(&key, value)
            }
            Err(error) => {
                guard.settle(SlotState::Failed { attempt, error: error.clone() });
                Err(error)
            }
        }
    }

    /// Whether a value has been published under `key`.
    pub fn contains(&self, key: &K) -> bool {
        let Some(slot) = self.slots.lock().get(key).cloned() else {
            return false;
        };
        let state = slot.state.lock();
        matches!(&*state, SlotState::Ready(_))
    }

    /// How many times a computation has been started, across all keys.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    fn slot(&self, key: &K) -> Arc<Slot> {
        self.slots
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone()
    }
}

fn downcast<K: Debug, V: Send + Sync + 'static>(key: &K, value: Value) -> Result<Arc<V>, PipelineError> {
    value.downcast::<V>().map_err(|_| {
        PipelineError::InvariantViolation(format!(
            "cached value for {key:?} is not a {}",
            std::any::type_name::<V>()
        ))
    })
}
