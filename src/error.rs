//! Error types for dby-bridge
//!
//! Provides a unified error type for every bridge operation. The bridge
//! boundary turns all of these into an [`Outcome`](crate::bridge::Outcome)
//! so nothing here is fatal to the caller's process.

use thiserror::Error;

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    /// Parameter sequences of unequal length, or tokens that would break the
    /// command grammar. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Queue Errors
    // -------------------------------------------------------------------------
    /// Every slot of one full ring cycle is still occupied.
    #[error("Queue is full, try again later")]
    SlotsExhausted,

    /// The poll loop was aborted by a cancellation or deadline signal.
    #[error("Request cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// The shared store could not be reached or replied with an error.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A command string that does not follow the daemon grammar.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Whether a caller may reasonably retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::SlotsExhausted | BridgeError::StoreUnavailable(_)
        )
    }
}
