//! Store Module
//!
//! The shared key-value store the bridge and the worker daemon meet in.
//!
//! ## Contract
//! - String keys, string values
//! - Single-key atomicity only, no transactions
//! - Every call is an independent round trip
//!
//! ## Implementations
//! - [`MemoryStore`]: in-process map, for tests and embedded use
//! - [`RedisStore`]: `redis` crate client with a small connection pool

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use std::sync::Arc;

use crate::error::Result;

/// Opaque get/set/delete access to the shared store
///
/// Implementations report an unreachable or failing store as
/// [`BridgeError::StoreUnavailable`](crate::BridgeError::StoreUnavailable).
pub trait KeyValueStore: Send + Sync {
    /// Read a key, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, returns whether the store accepted it
    fn set(&self, key: &str, value: &str) -> Result<bool>;

    /// Remove a key, returns whether it existed
    fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether a key is present
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<bool> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
}
