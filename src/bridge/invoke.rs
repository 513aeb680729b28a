//! Bridge implementation
//!
//! One `Bridge` serves any number of concurrent callers. It holds no mutable
//! state of its own; the shared store is the only coordination point.

use std::sync::Arc;

use super::{CancelToken, Outcome, PollPolicy};
use crate::config::{AllocationMode, BridgeConfig};
use crate::error::{BridgeError, Result};
use crate::protocol::{self, Operation};
use crate::slot::{AllocatorHandle, KeySpace, SerializedAllocator, Slot, SlotAllocator};
use crate::store::KeyValueStore;

/// Where slots come from
enum SlotSource {
    Direct(SlotAllocator),
    Serialized(AllocatorHandle),
}

impl SlotSource {
    fn acquire(&self) -> Result<Slot> {
        match self {
            SlotSource::Direct(allocator) => allocator.acquire(),
            SlotSource::Serialized(handle) => handle.acquire(),
        }
    }
}

/// Synchronous front for the worker daemon
pub struct Bridge {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
    slots: SlotSource,
    policy: PollPolicy,
}

impl Bridge {
    /// Create a bridge over `store`
    ///
    /// With [`AllocationMode::Serialized`] this spawns a private allocator
    /// thread; use [`Bridge::with_allocator`] to share one between bridges.
    pub fn new(store: Arc<dyn KeyValueStore>, config: &BridgeConfig) -> Result<Self> {
        config.validate()?;

        let keys = config.key_space();
        let allocator = SlotAllocator::new(Arc::clone(&store), keys.clone());
        let slots = match config.allocation {
            AllocationMode::Direct => SlotSource::Direct(allocator),
            AllocationMode::Serialized => SlotSource::Serialized(SerializedAllocator::spawn(allocator)?),
        };

        Ok(Self {
            store,
            keys,
            slots,
            policy: config.poll_policy(),
        })
    }

    /// Create a bridge that allocates through an existing allocator thread
    pub fn with_allocator(
        store: Arc<dyn KeyValueStore>,
        config: &BridgeConfig,
        handle: AllocatorHandle,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            keys: config.key_space(),
            slots: SlotSource::Serialized(handle),
            policy: config.poll_policy(),
        })
    }

    /// Run one operation with the configured poll policy
    pub fn invoke(&self, operation: &Operation, cancel: &CancelToken) -> Outcome {
        self.invoke_with(operation, self.policy, cancel)
    }

    /// Run one operation with an explicit poll policy
    ///
    /// Steps:
    /// 1. Encode and validate (no store access on failure)
    /// 2. Acquire a slot
    /// 3. Clear any stale response, write the command
    /// 4. Return at once for fire-and-forget operations, otherwise poll
    pub fn invoke_with(&self, operation: &Operation, policy: PollPolicy, cancel: &CancelToken) -> Outcome {
        match self.try_invoke(operation, policy, cancel) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!("{} failed: {}", operation.kind(), e);
                Outcome::Failed(e)
            }
        }
    }

    fn try_invoke(&self, operation: &Operation, policy: PollPolicy, cancel: &CancelToken) -> Result<Outcome> {
        let command = protocol::encode(operation)?;

        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let slot = self.slots.acquire()?;

        // A late answer to an earlier request on this slot would otherwise
        // satisfy ours
        let response_key = self.keys.response_key(slot);
        if self.store.delete(&response_key)? {
            tracing::debug!("Cleared stale response on slot {}", slot);
        }

        self.store.set(&self.keys.command_key(slot), &command)?;
        tracing::debug!("Slot {} <- {:?}", slot, command);

        if !operation.expects_response() {
            return Ok(Outcome::Accepted(String::new()));
        }

        self.try_poll(slot, policy, cancel)
    }

    /// Wait for the response on `slot`
    ///
    /// Used internally after a command is written, and by callers re-polling
    /// a slot returned in [`Outcome::Pending`].
    pub fn poll(&self, slot: Slot, policy: PollPolicy, cancel: &CancelToken) -> Outcome {
        self.try_poll(slot, policy, cancel)
            .unwrap_or_else(Outcome::Failed)
    }

    fn try_poll(&self, slot: Slot, policy: PollPolicy, cancel: &CancelToken) -> Result<Outcome> {
        let response_key = self.keys.response_key(slot);

        for attempt in 1..=policy.max_attempts {
            if cancel.is_cancelled() {
                tracing::debug!("Poll on slot {} cancelled before attempt {}", slot, attempt);
                return Err(BridgeError::Cancelled);
            }

            match self.store.get(&response_key)? {
                Some(text) if !text.is_empty() => {
                    // Releases the slot; a failed delete only leaves a stale
                    // response the next owner clears
                    if let Err(e) = self.store.delete(&response_key) {
                        tracing::warn!("Could not clear response on slot {}: {}", slot, e);
                    }
                    tracing::debug!("Slot {} answered on attempt {}", slot, attempt);
                    return Ok(Outcome::Accepted(text));
                }
                _ => tracing::trace!("Slot {} empty on attempt {}", slot, attempt),
            }

            if attempt < policy.max_attempts && cancel.wait(policy.interval) {
                tracing::debug!("Poll on slot {} cancelled while waiting", slot);
                return Err(BridgeError::Cancelled);
            }
        }

        tracing::debug!(
            "No response on slot {} after {} attempts",
            slot,
            policy.max_attempts
        );
        Ok(Outcome::Pending(slot))
    }

    /// Key layout in use
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Default poll policy
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }
}
