//! In-process cache with per-entry expiry.
//!
//! Entries are evicted lazily: every read checks the entry's age and drops it
//! once it has lived for its full TTL. There is no background sweep.

use chrono::{DateTime, Duration, Utc};
use meteoquiz_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A cached value together with the time it was stored and its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            stored_at,
            ttl,
        }
    }

    /// Valid iff `now - stored_at < ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.stored_at < self.ttl
    }
}

/// Volatile key/value cache guarded by a single mutex.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Return the value for `key` if present and not expired.
    ///
    /// An expired entry is removed, so later reads miss as well until the
    /// key is set again.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let entry = entries.get(key)?;
        if entry.is_valid_at(now) {
            return Some(entry.value.clone());
        }

        tracing::debug!("Cache entry expired: {}", key);
        entries.remove(key);
        None
    }

    /// Store `value` under `key`, replacing any previous entry and resetting its age.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry::new(value, self.clock.now(), self.ttl);
        self.entries.lock().insert(key.into(), entry);
    }

    /// Drop the entry for `key`, returning whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
