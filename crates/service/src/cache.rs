//! Read-through cache for rendered `resolve` responses. Its own
//! readers-writer lock, independent of the catalog registry's, per spec §5:
//! "The optional in-memory cache ... uses its own readers-writer lock and is
//! otherwise independent."

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

struct Entry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub enabled: bool,
    pub size: usize,
}

pub struct Cache {
    enabled: bool,
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Cache {
    pub fn new(enabled: bool, ttl: Duration, max_entries: usize) -> Self {
        Self {
            enabled,
            ttl,
            max_entries,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the cached value for `key` if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let guard = self.entries.read().expect("cache lock poisoned");
        let entry = guard.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Inserts `value` under `key` with this cache's configured TTL. A
    /// full cache evicts one arbitrary entry before inserting, which is
    /// acceptable for a best-effort read-through cache with no durability
    /// requirement.
    pub fn put(&self, key: String, value: Value) {
        if !self.enabled {
            return;
        }
        let mut guard = self.entries.write().expect("cache lock poisoned");
        if guard.len() >= self.max_entries {
            if let Some(evict_key) = guard.keys().next().cloned() {
                guard.remove(&evict_key);
            }
        }
        guard.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Evicts one entry; returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut guard = self.entries.write().expect("cache lock poisoned");
        guard.remove(key).is_some()
    }

    pub fn status(&self) -> CacheStatus {
        let size = self.entries.read().expect("cache lock poisoned").len();
        CacheStatus {
            enabled: self.enabled,
            size,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_cache_never_returns_a_hit() {
        let cache = Cache::new(false, Duration::from_secs(60), 10);
        cache.put("a".to_string(), serde_json::json!({"x": 1}));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = Cache::new(true, Duration::from_millis(1), 10);
        cache.put("a".to_string(), serde_json::json!({"x": 1}));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn invalidate_removes_an_entry() {
        let cache = Cache::new(true, Duration::from_secs(60), 10);
        cache.put("a".to_string(), serde_json::json!(1));
        assert!(cache.invalidate("a"));
        assert!(cache.get("a").is_none());
        assert!(!cache.invalidate("a"));
    }
}
