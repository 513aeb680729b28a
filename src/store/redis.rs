//! Redis store client
//!
//! Thin adapter over the `redis` crate. Connections are pooled: the pool lock
//! is only held to check a connection out or back in, never across a round
//! trip. A connection that fails at the transport level is dropped rather
//! than returned.

use std::time::Duration;

use parking_lot::Mutex;
use redis::{Client, Commands, Connection, RedisError};

use super::KeyValueStore;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

/// Redis-backed key-value store
pub struct RedisStore {
    /// Store address (host:port)
    addr: String,

    client: Client,

    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,

    /// Idle connections ready for reuse
    idle: Mutex<Vec<Connection>>,

    max_idle: usize,
}

impl RedisStore {
    /// Create a store client from the connection settings in `config`
    ///
    /// Only checks the address; the first connection is opened lazily.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let addr = config.store_addr.trim();
        let valid = match addr.rsplit_once(':') {
            Some((host, port)) => {
                !host.is_empty() && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
            }
            None => false,
        };
        if !valid {
            return Err(BridgeError::Config(format!(
                "store address '{}' is not host:port",
                config.store_addr
            )));
        }

        // The database index is selected by the client on every new connection
        let url = format!("redis://{}/{}", addr, config.store_db);
        let client = Client::open(url.as_str())
            .map_err(|e| BridgeError::Config(format!("invalid store address '{}': {}", addr, e)))?;

        Ok(Self {
            addr: addr.to_string(),
            client,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms.max(1)),
            read_timeout: timeout(config.read_timeout_ms),
            write_timeout: timeout(config.write_timeout_ms),
            idle: Mutex::new(Vec::new()),
            max_idle: config.max_idle_connections,
        })
    }

    /// Connect and verify the server answers `PING`
    pub fn connect(config: &BridgeConfig) -> Result<Self> {
        let store = Self::new(config)?;
        store.ping()?;
        Ok(store)
    }

    /// Round-trip a `PING`
    pub fn ping(&self) -> Result<()> {
        let reply: String = self.request("PING", |conn| redis::cmd("PING").query(conn))?;
        if reply != "PONG" {
            return Err(BridgeError::StoreUnavailable(format!(
                "unexpected reply to PING: {:?}",
                reply
            )));
        }
        Ok(())
    }

    /// Address this client talks to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Number of pooled idle connections
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().len()
    }

    /// Run one command on a pooled connection
    ///
    /// Every failure, including replies of the wrong shape, surfaces as
    /// `StoreUnavailable`.
    fn request<T, F>(&self, command: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> redis::RedisResult<T>,
    {
        let mut conn = self.checkout()?;

        match f(&mut conn) {
            Ok(value) => {
                self.checkin(conn);
                Ok(value)
            }
            Err(e) => {
                if is_broken(&e) {
                    tracing::warn!("{} to {} failed, dropping connection: {}", command, self.addr, e);
                } else {
                    self.checkin(conn);
                }
                Err(unavailable(command, e))
            }
        }
    }

    fn checkout(&self) -> Result<Connection> {
        if let Some(conn) = self.idle.lock().pop() {
            return Ok(conn);
        }

        tracing::debug!("Opening store connection to {}", self.addr);
        let conn = self
            .client
            .get_connection_with_timeout(self.connect_timeout)
            .and_then(|conn| {
                conn.set_read_timeout(self.read_timeout)?;
                conn.set_write_timeout(self.write_timeout)?;
                Ok(conn)
            })
            .map_err(|e| BridgeError::StoreUnavailable(format!("{}: {}", self.addr, e)))?;

        Ok(conn)
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.request("GET", |conn| conn.get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<bool> {
        self.request("SET", |conn| conn.set::<_, _, ()>(key, value))?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed: i64 = self.request("DEL", |conn| conn.del(key))?;
        Ok(removed > 0)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.request("EXISTS", |conn| conn.exists(key))
    }
}

fn timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Whether the connection can no longer be trusted to be in sync
fn is_broken(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_timeout() || e.is_connection_refusal()
}

fn unavailable(command: &str, e: RedisError) -> BridgeError {
    BridgeError::StoreUnavailable(format!("{} failed: {}", command, e))
}
