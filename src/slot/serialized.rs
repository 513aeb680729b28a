//! Serialized slot allocation
//!
//! One owner thread runs every allocation for the process. Callers reach it
//! only through [`AllocatorHandle`], so the counter read/check/write sequence
//! never interleaves between bridges sharing a handle. Processes that write
//! the same counter key can still collide.

use std::thread;

use crossbeam::channel::{self, Receiver, Sender};

use super::{Slot, SlotAllocator};
use crate::error::{BridgeError, Result};

/// A pending allocation: the reply goes back on the enclosed channel
type AcquireRequest = Sender<Result<Slot>>;

/// Owner thread for a [`SlotAllocator`]
pub struct SerializedAllocator;

impl SerializedAllocator {
    /// Move `allocator` onto a dedicated thread
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn(allocator: SlotAllocator) -> Result<AllocatorHandle> {
        let (tx, rx) = channel::unbounded::<AcquireRequest>();

        thread::Builder::new()
            .name("dby-slot-allocator".to_string())
            .spawn(move || run(allocator, rx))?;

        Ok(AllocatorHandle { requests: tx })
    }
}

fn run(allocator: SlotAllocator, requests: Receiver<AcquireRequest>) {
    tracing::debug!("Slot allocator thread started");
    for reply in requests.iter() {
        // Caller may have given up; nothing to do then
        let _ = reply.send(allocator.acquire());
    }
    tracing::debug!("Slot allocator thread stopped");
}

/// Cloneable handle to the allocator thread
#[derive(Clone)]
pub struct AllocatorHandle {
    requests: Sender<AcquireRequest>,
}

impl AllocatorHandle {
    /// Claim the next free slot, waiting for queued allocations ahead of us
    pub fn acquire(&self) -> Result<Slot> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.requests.send(reply_tx).map_err(|_| stopped())?;
        reply_rx.recv().map_err(|_| stopped())?
    }
}

fn stopped() -> BridgeError {
    BridgeError::StoreUnavailable("slot allocator thread stopped".to_string())
}
