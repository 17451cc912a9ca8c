//! Key-value cache capability used by the analysis gateway.
//!
//! Stores hold serialized analysis results as strings with a per-entry TTL. Store errors are
//! reported to the caller; deciding to swallow them is the gateway's job.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Connectivity of a cache store as observed by a ping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheState {
    Connected,
    /// No store configured (`None`) or the store could not be reached.
    Unavailable(Option<String>),
    Error(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Probe connectivity.
    async fn ping(&self) -> Result<(), CacheError>;
    /// Read a live entry. Expired or absent keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Write `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    /// Backend name reported by the cache status endpoint.
    fn backend(&self) -> &str;
}

struct Slot {
    value: String,
    expires_at: Instant,
}

/// In-process store with lazy expiry.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Slot>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> CacheError {
        CacheError::Operation("memory store lock poisoned".into())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn ping(&self) -> Result<(), CacheError> {
        self.entries.lock().map(|_| ()).map_err(|_| Self::poisoned())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        let now = Instant::now();

        match entries.get(key) {
            Some(slot) if slot.expires_at > now => Ok(Some(slot.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        entries.retain(|_, slot| slot.expires_at > now);
        entries.insert(
            key.to_owned(),
            Slot {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    fn backend(&self) -> &str {
        "memory"
    }
}
