//! File-backed cache that survives process restarts.
//!
//! The whole mapping is loaded once when the cache is opened and rewritten in
//! full on every mutation. On disk it is a JSON object whose values are
//! `[value, "<RFC 3339 stored_at>"]` pairs, so expiry carries over restarts.

use chrono::{DateTime, Duration, Utc};
use meteoquiz_core::{AppError, Clock};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheEntry;
use crate::types::WeatherError;

type Entries<V> = HashMap<String, CacheEntry<V>>;

/// Durable key/value cache with per-entry expiry.
///
/// Reads and writes share one mutex; the file rewrite happens while it is
/// held, so there is a single writer and readers always see their own writes.
#[derive(Debug)]
pub struct DurableCache<V> {
    path: PathBuf,
    entries: Mutex<Entries<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> DurableCache<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Open the cache stored at `path`.
    ///
    /// A missing or unreadable file yields an empty cache; it is never fatal.
    pub fn open(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let entries = match Self::load(&path, ttl) {
            Ok(entries) => {
                tracing::info!(
                    "Loaded {} durable cache entries from {}",
                    entries.len(),
                    path.display()
                );
                entries
            }
            Err(e) => {
                tracing::warn!("{}; starting with an empty cache", e);
                HashMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
            ttl,
            clock,
        }
    }

    fn load(path: &Path, ttl: Duration) -> Result<Entries<V>, AppError> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let contents = std::fs::read(path)
            .map_err(|e| AppError::CacheLoad(format!("{}: {}", path.display(), e)))?;

        let raw: HashMap<String, (V, DateTime<Utc>)> = serde_json::from_slice(&contents)
            .map_err(|e| AppError::CacheLoad(format!("{}: {}", path.display(), e)))?;

        Ok(raw
            .into_iter()
            .map(|(key, (value, stored_at))| (key, CacheEntry::new(value, stored_at, ttl)))
            .collect())
    }

    /// Return the value for `key` if present and not expired.
    ///
    /// An expired entry is removed and the store rewritten; a failure of that
    /// rewrite is only logged since the in-memory state is already correct.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let entry = entries.get(key)?;
        if entry.is_valid_at(now) {
            return Some(entry.value.clone());
        }

        tracing::debug!("Durable cache entry expired: {}", key);
        entries.remove(key);
        if let Err(e) = self.flush(&entries) {
            tracing::warn!("Failed to persist eviction of {}: {}", key, e);
        }
        None
    }

    /// Store `value` under `key` and rewrite the backing file.
    ///
    /// The in-memory update is kept even when the write fails; the error is
    /// returned so the caller can report it.
    pub fn set(&self, key: impl Into<String>, value: V) -> Result<(), WeatherError> {
        let entry = CacheEntry::new(value, self.clock.now(), self.ttl);
        let mut entries = self.entries.lock();
        entries.insert(key.into(), entry);
        self.flush(&entries)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the full mapping and replace the backing file.
    ///
    /// Writes to a sibling temp file first so a crash mid-write leaves the
    /// previous store intact.
    fn flush(&self, entries: &Entries<V>) -> Result<(), WeatherError> {
        let snapshot: BTreeMap<&str, (&V, &DateTime<Utc>)> = entries
            .iter()
            .map(|(key, entry)| (key.as_str(), (&entry.value, &entry.stored_at)))
            .collect();

        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| WeatherError::Cache(format!("serialize: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WeatherError::Cache(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, bytes)
            .map_err(|e| WeatherError::Cache(format!("write {}: {}", tmp_path.display(), e)))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| WeatherError::Cache(format!("replace {}: {}", self.path.display(), e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;
    use meteoquiz_core::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::new_at(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap())
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let cache: DurableCache<Vec<String>> = DurableCache::open(
            dir.path().join("cache.json"),
            Duration::days(30),
            Arc::new(clock),
        );

        cache.set("search_rome", vec!["Rome".to_string()]).unwrap();
        assert_eq!(cache.get("search_rome"), Some(vec!["Rome".to_string()]));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let clock = clock();

        {
            let cache: DurableCache<String> =
                DurableCache::open(&path, Duration::days(30), Arc::new(clock.clone()));
            cache.set("search_paris", "Paris".to_string()).unwrap();
        }

        let reopened: DurableCache<String> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock));
        assert_eq!(reopened.get("search_paris").as_deref(), Some("Paris"));
    }

    #[test]
    fn test_expiry_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let clock = clock();

        {
            let cache: DurableCache<String> =
                DurableCache::open(&path, Duration::days(30), Arc::new(clock.clone()));
            cache.set("k", "v".to_string()).unwrap();
        }

        clock.advance(Duration::days(30) + Duration::seconds(1));
        let reopened: DurableCache<String> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock));
        assert!(reopened.get("k").is_none());
        assert!(reopened.is_empty());

        // The eviction was written back
        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(on_disk.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_ttl_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let cache: DurableCache<u32> = DurableCache::open(
            dir.path().join("cache.json"),
            Duration::days(30),
            Arc::new(clock.clone()),
        );
        cache.set("k", 7).unwrap();

        clock.advance(Duration::days(30) - Duration::seconds(1));
        assert_eq!(cache.get("k"), Some(7));

        clock.advance(Duration::seconds(2));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_file_layout_is_value_timestamp_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache: DurableCache<String> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock()));
        cache.set("search_rome", "Rome".to_string()).unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let pair = on_disk["search_rome"].as_array().unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0], "Rome");
        let stored_at: DateTime<Utc> = pair[1].as_str().unwrap().parse().unwrap();
        assert_eq!(stored_at, clock().now());
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let cache: DurableCache<String> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock()));
        assert!(cache.is_empty());

        // Still usable, and the next write replaces the corrupt file
        cache.set("k", "v".to_string()).unwrap();
        let reopened: DurableCache<String> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock()));
        assert_eq!(reopened.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache: DurableCache<String> = DurableCache::open(
            dir.path().join("absent.json"),
            Duration::days(30),
            Arc::new(clock()),
        );
        assert!(cache.is_empty());
        assert!(cache.get("anything").is_none());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("blocked");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupant"), b"x").unwrap();

        let cache: DurableCache<String> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock()));
        let result = cache.set("k", "v".to_string());

        assert!(matches!(result, Err(WeatherError::Cache(_))));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_concurrent_writers_leave_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let clock = clock();
        let cache: Arc<DurableCache<u32>> = Arc::new(DurableCache::open(
            &path,
            Duration::days(30),
            Arc::new(clock.clone()),
        ));

        let threads = 8;
        let per_thread = 20;
        std::thread::scope(|s| {
            for t in 0..threads {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..per_thread {
                        let key = format!("search_{}_{}", t, i);
                        cache.set(key.clone(), t * 100 + i).unwrap();
                        assert_eq!(cache.get(&key), Some(t * 100 + i));
                    }
                });
            }
        });

        assert_eq!(cache.len(), (threads * per_thread) as usize);

        let raw: HashMap<String, (u32, DateTime<Utc>)> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), (threads * per_thread) as usize);

        let reopened: DurableCache<u32> =
            DurableCache::open(&path, Duration::days(30), Arc::new(clock));
        for t in 0..threads {
            for i in 0..per_thread {
                assert_eq!(reopened.get(&format!("search_{}_{}", t, i)), Some(t * 100 + i));
            }
        }
    }
}
