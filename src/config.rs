//! Configuration for dby-bridge
//!
//! Centralized configuration with defaults matching the key layout the
//! worker daemon expects.

use std::time::Duration;

use crate::bridge::PollPolicy;
use crate::error::{BridgeError, Result};
use crate::slot::KeySpace;

/// Default ring size
pub const DEFAULT_MAX_SLOTS: u32 = 10;

/// Command key prefix (must match the daemon)
pub const DEFAULT_COMMAND_PREFIX: &str = "dby_command_queue_";

/// Response key prefix (must match the daemon)
pub const DEFAULT_RESPONSE_PREFIX: &str = "dby_response_queue_";

/// Well-known key holding the next candidate slot
pub const DEFAULT_COUNTER_KEY: &str = "dby_command_queue_counter";

/// Main configuration for a bridge instance
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    // -------------------------------------------------------------------------
    // Queue Layout
    // -------------------------------------------------------------------------
    /// Number of correlation slots in the ring
    pub max_slots: u32,

    /// Prefix of the key a command is written to (`prefix + slot`)
    pub command_prefix: String,

    /// Prefix of the key the daemon writes its response to
    pub response_prefix: String,

    /// Key holding the ring counter
    pub counter_key: String,

    /// How slots are handed out
    pub allocation: AllocationMode,

    // -------------------------------------------------------------------------
    // Polling
    // -------------------------------------------------------------------------
    /// Wait between two response polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Maximum number of response polls per request
    pub max_attempts: u32,

    // -------------------------------------------------------------------------
    // Store Connection
    // -------------------------------------------------------------------------
    /// Store address (host:port)
    pub store_addr: String,

    /// Logical database index selected after connecting
    pub store_db: u32,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// Idle connections kept for reuse
    pub max_idle_connections: usize,
}

/// Slot allocation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Read-then-write the shared counter from the calling thread.
    /// Concurrent allocators may race and hand out the same slot.
    Direct,

    /// Route every allocation through one owner thread. Removes races between
    /// bridges in this process; other processes can still collide.
    Serialized,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_slots: DEFAULT_MAX_SLOTS,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            response_prefix: DEFAULT_RESPONSE_PREFIX.to_string(),
            counter_key: DEFAULT_COUNTER_KEY.to_string(),
            allocation: AllocationMode::Direct,
            poll_interval_ms: 10,
            max_attempts: 5,
            store_addr: "127.0.0.1:6379".to_string(),
            store_db: 0,
            connect_timeout_ms: 2000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_idle_connections: 8,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values the bridge cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_slots == 0 {
            return Err(BridgeError::Config("max_slots must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(BridgeError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.command_prefix.is_empty() || self.response_prefix.is_empty() {
            return Err(BridgeError::Config("key prefixes must not be empty".to_string()));
        }
        if self.command_prefix == self.response_prefix {
            return Err(BridgeError::Config(format!(
                "command and response prefixes must differ (both '{}')",
                self.command_prefix
            )));
        }
        if self.counter_key.is_empty() {
            return Err(BridgeError::Config("counter_key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Key layout derived from this config
    pub fn key_space(&self) -> KeySpace {
        KeySpace {
            command_prefix: self.command_prefix.clone(),
            response_prefix: self.response_prefix.clone(),
            counter_key: self.counter_key.clone(),
            max_slots: self.max_slots,
        }
    }

    /// Default poll policy derived from this config
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(self.poll_interval_ms), self.max_attempts)
    }
}

/// Builder for BridgeConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: BridgeConfig,
}

impl ConfigBuilder {
    /// Set the ring size
    pub fn max_slots(mut self, count: u32) -> Self {
        self.config.max_slots = count;
        self
    }

    /// Set the command key prefix
    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.command_prefix = prefix.into();
        self
    }

    /// Set the response key prefix
    pub fn response_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.response_prefix = prefix.into();
        self
    }

    /// Set the counter key
    pub fn counter_key(mut self, key: impl Into<String>) -> Self {
        self.config.counter_key = key.into();
        self
    }

    /// Set the allocation strategy
    pub fn allocation(mut self, mode: AllocationMode) -> Self {
        self.config.allocation = mode;
        self
    }

    /// Set the poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the maximum number of polls
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the store address
    pub fn store_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.store_addr = addr.into();
        self
    }

    /// Set the logical database index
    pub fn store_db(mut self, db: u32) -> Self {
        self.config.store_db = db;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set how many idle store connections are kept
    pub fn max_idle_connections(mut self, count: usize) -> Self {
        self.config.max_idle_connections = count;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
