//! Keyspace implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::{CacheEntry, Clock, SystemClock};

/// Shared expiring key-value store
#[derive(Debug)]
pub struct Keyspace {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl Keyspace {
    /// Create an empty keyspace on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty keyspace on the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Insert or overwrite a key
    ///
    /// The new entry's expiry fully replaces the old one: `None` means
    /// the key never expires, `Some(ttl)` expires at `now + ttl`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| self.clock.now() + ttl);
        let entry = CacheEntry {
            value: value.into(),
            expires_at,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Get a live value
    ///
    /// An expired entry is reported absent and removed.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();

        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        self.evict_if_expired(key, now);
        None
    }

    /// Remove a key, returning whether a live entry was removed
    pub fn delete(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .write()
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remove `key` if it is expired at `now`
    ///
    /// Re-checks under the write lock: a concurrent SET may have replaced
    /// the entry since the caller looked at it.
    fn evict_if_expired(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            tracing::trace!("Evicted expired key '{}'", key);
            true
        } else {
            false
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    // =========================================================================
    // Introspection (no expiry check)
    // =========================================================================

    /// Whether the key is stored, live or not yet evicted
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Snapshot of stored keys, including expired ones not yet evicted
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}
