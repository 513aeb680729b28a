//! Slot Module
//!
//! Correlation slots pair a command with its eventual response.
//!
//! ## Ring Layout
//! ```text
//!   counter_key           → next candidate slot (decimal string)
//!   command_prefix + N    → command text for slot N
//!   response_prefix + N   → response text for slot N
//! ```
//!
//! Slots cycle through `[0, max_slots)`. A slot is free when its command key
//! is absent; the daemon deletes the command key once consumed.

mod allocator;
mod serialized;

pub use allocator::SlotAllocator;
pub use serialized::{AllocatorHandle, SerializedAllocator};

use std::fmt;

/// A correlation identifier in `[0, max_slots)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u32);

impl Slot {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key names for one ring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    pub command_prefix: String,
    pub response_prefix: String,
    pub counter_key: String,
    pub max_slots: u32,
}

impl KeySpace {
    /// Key the command for `slot` is written to
    pub fn command_key(&self, slot: Slot) -> String {
        format!("{}{}", self.command_prefix, slot)
    }

    /// Key the daemon answers `slot` on
    pub fn response_key(&self, slot: Slot) -> String {
        format!("{}{}", self.response_prefix, slot)
    }

    /// Parse a command key back into its slot
    pub fn slot_of_command_key(&self, key: &str) -> Option<Slot> {
        key.strip_prefix(&self.command_prefix)?
            .parse::<u32>()
            .ok()
            .filter(|n| *n < self.max_slots)
            .map(Slot)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        crate::config::BridgeConfig::default().key_space()
    }
}
