//! Front API of the resolution cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::category::{CacheCategory, CacheTtls};
use crate::store::{CacheStore, MemoryStore, StoredEntry};

/// Default ceiling on the number of stored entries.
pub const DEFAULT_MAX_ENTRIES: usize = 2048;

/// Snapshot of cache occupancy, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub valid: usize,
    /// Entry count keyed by category name.
    pub per_category: HashMap<String, usize>,
}

/// TTL-keyed cache in front of the catalog resolver.
///
/// Values are stored JSON-encoded. Store failures never propagate to the
/// caller: a failing read is a miss, a failing write is dropped, both are
/// logged. The resolution pipeline must keep working when the cache does
/// not.
#[derive(Clone)]
pub struct ResolutionCache {
    store: Arc<dyn CacheStore>,
    ttls: CacheTtls,
    max_entries: usize,
}

impl ResolutionCache {
    pub fn new(store: Arc<dyn CacheStore>, ttls: CacheTtls, max_entries: usize) -> Self {
        Self {
            store,
            ttls,
            max_entries,
        }
    }

    /// In-memory cache with the default TTL table and ceiling.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            CacheTtls::default(),
            DEFAULT_MAX_ENTRIES,
        )
    }

    /// Fetch and decode a value. Expired entries are deleted and reported
    /// as a miss (lazy expiry); undecodable payloads are dropped the same
    /// way.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = match self.store.load(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        if entry.is_expired(Utc::now().timestamp()) {
            debug!(key, "cache entry expired, evicting");
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to evict expired cache entry");
            }
            return None;
        }

        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "undecodable cache payload, evicting");
                let _ = self.store.remove(key);
                None
            }
        }
    }

    /// Store a value with the TTL of the key's category.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.ttls.for_key(key));
    }

    /// Store a value with an explicit TTL, then enforce the item ceiling by
    /// evicting oldest-inserted entries.
    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache payload");
                return;
            }
        };

        let now = Utc::now().timestamp();
        let entry = StoredEntry {
            key: key.to_string(),
            payload,
            inserted_at: now,
            expires_at: now.saturating_add(ttl.as_secs() as i64),
        };

        if let Err(e) = self.store.store(entry) {
            warn!(key, error = %e, "cache write failed");
            return;
        }

        self.enforce_ceiling();
    }

    fn enforce_ceiling(&self) {
        let total = match self.store.count() {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, "cache count failed, skipping eviction");
                return;
            }
        };
        if total <= self.max_entries {
            return;
        }
        let excess = total - self.max_entries;
        match self.store.remove_oldest(excess) {
            Ok(removed) => debug!(removed, "evicted oldest cache entries over ceiling"),
            Err(e) => warn!(error = %e, "cache eviction failed"),
        }
    }

    /// Delete a single entry; returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key, error = %e, "cache delete failed");
                false
            }
        }
    }

    /// Maintenance: drop every expired entry now instead of lazily.
    /// Returns the number of entries removed.
    pub fn clear_expired(&self) -> usize {
        match self.store.remove_expired(Utc::now().timestamp()) {
            Ok(removed) => {
                if removed > 0 {
                    debug!(removed, "cleared expired cache entries");
                }
                removed
            }
            Err(e) => {
                warn!(error = %e, "failed to clear expired cache entries");
                0
            }
        }
    }

    /// Drop everything.
    pub fn clear_all(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear cache");
        }
    }

    /// Occupancy snapshot. On store errors the numbers degrade to zero.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now().timestamp();
        let total = self.store.count().unwrap_or_else(|e| {
            warn!(error = %e, "cache stats: count failed");
            0
        });
        let expired = self.store.count_expired(now).unwrap_or(0);
        let mut per_category = HashMap::new();
        for category in CacheCategory::ALL {
            let count = self.store.count_prefix(category.prefix()).unwrap_or(0);
            per_category.insert(category.name().to_string(), count);
        }
        CacheStats {
            total,
            expired,
            valid: total.saturating_sub(expired),
            per_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = ResolutionCache::in_memory();
        cache.set("track:url", &vec!["a".to_string(), "b".to_string()]);
        let value: Option<Vec<String>> = cache.get("track:url");
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn expired_entry_is_a_miss_and_evicted() {
        let cache = ResolutionCache::in_memory();
        cache.set_with_ttl("search:q", &1u32, Duration::ZERO);
        // expires_at == now: make sure the deadline is strictly past
        std::thread::sleep(Duration::from_millis(1100));
        let value: Option<u32> = cache.get("search:q");
        assert_eq!(value, None);
        assert_eq!(cache.stats().total, 0);
    }

    #[test]
    fn ceiling_evicts_oldest_written_first() {
        let cache = ResolutionCache::new(Arc::new(MemoryStore::new()), CacheTtls::default(), 3);
        for i in 0..5 {
            cache.set(&format!("track:{i}"), &i);
        }
        assert_eq!(cache.stats().total, 3);
        assert_eq!(cache.get::<i32>("track:0"), None);
        assert_eq!(cache.get::<i32>("track:1"), None);
        assert_eq!(cache.get::<i32>("track:4"), Some(4));
    }

    #[test]
    fn stats_break_down_by_category() {
        let cache = ResolutionCache::in_memory();
        cache.set("track:a", &1);
        cache.set("track:b", &2);
        cache.set("album:c", &3);
        let stats = cache.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.per_category["track"], 2);
        assert_eq!(stats.per_category["album"], 1);
        assert_eq!(stats.per_category["playlist"], 0);
    }
}
