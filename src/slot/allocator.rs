//! Ring slot allocator
//!
//! Read-modify-write over the shared counter key.

use std::sync::Arc;

use super::{KeySpace, Slot};
use crate::error::{BridgeError, Result};
use crate::store::KeyValueStore;

/// Hands out free slots from the ring
///
/// ## Concurrency
///
/// `acquire` reads the counter, checks occupancy and writes the counter back
/// as separate store calls. Two allocators (in this process or another) can
/// read the same counter and both claim the same slot; the later command
/// write wins. Route allocation through [`SerializedAllocator`] to remove the
/// race inside one process.
///
/// [`SerializedAllocator`]: super::SerializedAllocator
pub struct SlotAllocator {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
}

impl SlotAllocator {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// Claim the next free slot
    ///
    /// Checks at most one full cycle starting from the counter. On success the
    /// counter moves to the slot after the one returned. On failure the
    /// counter is left untouched.
    pub fn acquire(&self) -> Result<Slot> {
        let max = self.keys.max_slots;
        if max == 0 {
            return Err(BridgeError::Config("ring has no slots".to_string()));
        }

        let mut candidate = self.read_counter()?;
        if candidate >= max {
            candidate = 0;
        }

        for _ in 0..max {
            let slot = Slot::new(candidate);
            if !self.store.exists(&self.keys.command_key(slot))? {
                let next = (candidate + 1) % max;
                self.store.set(&self.keys.counter_key, &next.to_string())?;
                tracing::debug!("Acquired slot {} (counter -> {})", slot, next);
                return Ok(slot);
            }

            tracing::trace!("Slot {} occupied", slot);
            candidate = (candidate + 1) % max;
        }

        tracing::warn!("All {} slots occupied", max);
        Err(BridgeError::SlotsExhausted)
    }

    /// Current counter value, 0 when absent or unreadable
    fn read_counter(&self) -> Result<u32> {
        match self.store.get(&self.keys.counter_key)? {
            None => Ok(0),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) => Ok(n),
                Err(_) => {
                    tracing::warn!(
                        "Counter '{}' holds non-numeric '{}', restarting at 0",
                        self.keys.counter_key,
                        raw
                    );
                    Ok(0)
                }
            },
        }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }
}
