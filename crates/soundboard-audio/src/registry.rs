//! Bookkeeping for clips that are currently playing.
//!
//! Every playback holds a [`PlaybackGuard`] for as long as its output stream
//! is alive. Dropping the guard releases the slot, so the number of live
//! streams can never exceed the registry capacity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Identifies one playback for logging and bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackId(u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Slots {
    next_id: u64,
    active: BTreeMap<PlaybackId, String>,
}

/// Cheaply cloneable registry shared between the player and its threads.
#[derive(Debug, Clone)]
pub struct PlaybackRegistry {
    slots: Arc<Mutex<Slots>>,
    capacity: usize,
}

/// Returned when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull {
    pub capacity: usize,
}

impl PlaybackRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim a slot for a new playback of `label`.
    pub fn reserve(&self, label: impl Into<String>) -> Result<PlaybackGuard, RegistryFull> {
        let mut slots = self.slots.lock();
        if slots.active.len() >= self.capacity {
            return Err(RegistryFull {
                capacity: self.capacity,
            });
        }
        let id = PlaybackId(slots.next_id);
        slots.next_id += 1;
        slots.active.insert(id, label.into());
        debug!(id = %id, active = slots.active.len(), "playback slot reserved");

        Ok(PlaybackGuard {
            id,
            registry: self.clone(),
        })
    }

    /// Number of playbacks currently holding a slot.
    pub fn active(&self) -> usize {
        self.slots.lock().active.len()
    }

    /// Labels of the live playbacks, oldest first.
    pub fn active_labels(&self) -> Vec<String> {
        self.slots.lock().active.values().cloned().collect()
    }

    fn release(&self, id: PlaybackId) {
        let mut slots = self.slots.lock();
        slots.active.remove(&id);
        debug!(id = %id, active = slots.active.len(), "playback slot released");
    }
}

/// Holds a registry slot until dropped.
#[derive(Debug)]
pub struct PlaybackGuard {
    id: PlaybackId,
    registry: PlaybackRegistry,
}

impl PlaybackGuard {
    pub fn id(&self) -> PlaybackId {
        self.id
    }
}

impl Drop for PlaybackGuard {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}
