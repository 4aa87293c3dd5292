/// Ephemeral key-value storage behind every short-lived credential:
/// login codes, resend throttles, verified-email markers and refresh
/// session hashes.
///
/// The trait is injected into services so tests run against the in-memory
/// implementation and production can bind a networked cache. TTLs are
/// honored lazily on read; `set_nx_with_ttl` is the atomic claim primitive
/// the resend throttle relies on.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::AppError;

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the live value for a key, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, replacing any previous one, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Write a value only if the key has no live entry. Returns whether
    /// the write happened. This is the atomic gate claim.
    async fn set_nx_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory key-value store.
///
/// Backs the test suites and single-node deployments. Expired entries are
/// dropped on access rather than by a sweeper.
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop a key immediately, as if its TTL had elapsed (for testing
    /// purposes).
    pub fn force_expire(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Entry exists but is stale; remove it under the write lock.
        let mut entries = self.entries.write().unwrap();
        if entries.get(key).map(|e| e.is_expired()).unwrap_or(false) {
            entries.remove(key);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_nx_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Ok(false),
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: value.to_string(),
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}
