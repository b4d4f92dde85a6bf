//! Backing store contract and the in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{CacheError, Result};

/// A raw cache entry as held by a backing store. Timestamps are unix
/// seconds; `payload` is the JSON-encoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub payload: String,
    pub inserted_at: i64,
    pub expires_at: i64,
}

impl StoredEntry {
    /// An entry is expired once its deadline is strictly in the past.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// Pluggable backing store for the resolution cache.
///
/// Implementations must tolerate concurrent calls from multiple tasks; they
/// are not required to provide cross-process consistency. Insertion order
/// must be preserved well enough to support oldest-first eviction.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Insert or replace an entry. Replacing refreshes insertion order.
    fn store(&self, entry: StoredEntry) -> Result<()>;

    /// Remove a single entry; returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Remove every entry expired at `now`; returns the number removed.
    fn remove_expired(&self, now: i64) -> Result<usize>;

    /// Remove up to `count` entries, oldest-inserted first; returns the
    /// number removed.
    fn remove_oldest(&self, count: usize) -> Result<usize>;

    fn clear(&self) -> Result<()>;

    fn count(&self) -> Result<usize>;

    fn count_expired(&self, now: i64) -> Result<usize>;

    fn count_prefix(&self, prefix: &str) -> Result<usize>;
}

#[derive(Default)]
struct MemoryInner {
    // key -> (insertion sequence, entry)
    entries: HashMap<String, (u64, StoredEntry)>,
    next_seq: u64,
}

/// In-memory store: a mutex-protected map with an insertion sequence for
/// oldest-first eviction.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked<T>(&self, f: impl FnOnce(&mut MemoryInner) -> T) -> Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CacheError::Store("memory store mutex poisoned".into()))?;
        Ok(f(&mut inner))
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        self.locked(|inner| inner.entries.get(key).map(|(_, e)| e.clone()))
    }

    fn store(&self, entry: StoredEntry) -> Result<()> {
        self.locked(|inner| {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.entries.insert(entry.key.clone(), (seq, entry));
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.locked(|inner| inner.entries.remove(key).is_some())
    }

    fn remove_expired(&self, now: i64) -> Result<usize> {
        self.locked(|inner| {
            let before = inner.entries.len();
            inner.entries.retain(|_, (_, e)| !e.is_expired(now));
            before - inner.entries.len()
        })
    }

    fn remove_oldest(&self, count: usize) -> Result<usize> {
        self.locked(|inner| {
            let mut by_age: Vec<(u64, String)> = inner
                .entries
                .iter()
                .map(|(key, (seq, _))| (*seq, key.clone()))
                .collect();
            by_age.sort_unstable();
            let victims: Vec<String> = by_age.into_iter().take(count).map(|(_, k)| k).collect();
            for key in &victims {
                inner.entries.remove(key);
            }
            victims.len()
        })
    }

    fn clear(&self) -> Result<()> {
        self.locked(|inner| inner.entries.clear())
    }

    fn count(&self) -> Result<usize> {
        self.locked(|inner| inner.entries.len())
    }

    fn count_expired(&self, now: i64) -> Result<usize> {
        self.locked(|inner| {
            inner
                .entries
                .values()
                .filter(|(_, e)| e.is_expired(now))
                .count()
        })
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize> {
        self.locked(|inner| {
            inner
                .entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .count()
        })
    }
}
