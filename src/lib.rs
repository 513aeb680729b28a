//! # dby-bridge
//!
//! A synchronous request/response bridge to a worker daemon that only talks
//! through a shared key-value store:
//! - Bounded ring of correlation slots with occupancy checks
//! - Plain-text command grammar (`def`, `add rel`, `rm`, `lst`, `gen`)
//! - Write-then-poll protocol with a bounded, cancellable wait
//! - Injectable store handle (in-memory or Redis over TCP)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Caller (CLI / router)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Operation
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Bridge                                │
//! │        validate → acquire → write → poll → Outcome           │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//!  ┌─────────────┐      ┌───────────────┐      ┌────────────────┐
//!  │  Protocol   │      │ SlotAllocator │      │ KeyValueStore  │
//!  │  (grammar)  │      │    (ring)     │─────▶│ (memory/redis) │
//!  └─────────────┘      └───────────────┘      └───────┬────────┘
//!                                                      │
//!                                              ┌───────▼────────┐
//!                                              │ Worker daemon  │
//!                                              └────────────────┘
//! ```
//!
//! ## Known limitations
//!
//! The daemon offers no acknowledgement beyond the response key. A command
//! the daemon never answers is indistinguishable from a slow one, and a late
//! response to an earlier request can satisfy a newer request that reused the
//! same slot.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod slot;
pub mod protocol;
pub mod bridge;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BridgeError, Result};
pub use config::{AllocationMode, BridgeConfig};
pub use bridge::{Bridge, CancelSource, CancelToken, Outcome, PollPolicy};
pub use protocol::{Operation, OperationKind};
pub use slot::Slot;
pub use store::{KeyValueStore, MemoryStore, RedisStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of dby-bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
