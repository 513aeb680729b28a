//! Bridge Module
//!
//! Turns the asynchronous store channel into a bounded synchronous call.
//!
//! ## Request Lifecycle
//! ```text
//! encode ─▶ acquire slot ─▶ clear stale response ─▶ write command
//!                                                        │
//!                          fire-and-forget ◀─────────────┤
//!                          (Accepted(""))                ▼
//!                                              poll response key
//!                                       (≤ max_attempts, interval apart)
//!                                                        │
//!                                Accepted(text) / Pending(slot) / Failed
//! ```

mod cancel;
mod invoke;

pub use cancel::{CancelSource, CancelToken};
pub use invoke::Bridge;

use std::time::Duration;

use crate::error::BridgeError;
use crate::slot::Slot;

/// Caller-visible text for a written fire-and-forget command
pub const COMMAND_INSERTED: &str = "Command Inserted";

/// Caller-visible text when no slot was free
pub const QUEUE_FULL: &str = "Queue is full, try again later.";

/// Caller-visible text when the poll budget ran out
pub const NO_RESPONSE: &str = "Could not find response before max retries expired.";

/// How long to wait for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between two polls
    pub interval: Duration,

    /// Total number of polls
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time the poll loop sleeps (no wait follows the last poll)
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(10), 5)
    }
}

/// Result of one bridge invocation
#[derive(Debug)]
pub enum Outcome {
    /// Command written; carries the daemon's response, empty for
    /// fire-and-forget operations
    Accepted(String),

    /// No response within the poll budget; the slot may be polled again
    Pending(Slot),

    /// Request did not complete
    Failed(BridgeError),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending(_))
    }

    /// Response text when accepted
    pub fn response(&self) -> Option<&str> {
        match self {
            Outcome::Accepted(text) => Some(text),
            _ => None,
        }
    }

    /// Failure reason when failed
    pub fn error(&self) -> Option<&BridgeError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Message for the caller
    pub fn message(&self) -> String {
        match self {
            Outcome::Accepted(text) if text.is_empty() => COMMAND_INSERTED.to_string(),
            Outcome::Accepted(text) => text.clone(),
            Outcome::Pending(_) => NO_RESPONSE.to_string(),
            Outcome::Failed(BridgeError::SlotsExhausted) => QUEUE_FULL.to_string(),
            Outcome::Failed(BridgeError::Validation(message)) => message.clone(),
            Outcome::Failed(e) => e.to_string(),
        }
    }
}
