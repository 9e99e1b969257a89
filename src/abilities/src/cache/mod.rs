//! Key-value cache backends for resolved abilities and roles
//!
//! Entries are written without expiry and only disappear through an explicit
//! refresh. A backend that supports tags can drop a whole namespace in one
//! call; one that doesn't forces the clipboard onto its per-principal path.
//! Tag membership is recorded at write time, so tags that share a prefix
//! never flush each other's keys.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cache backend used by [`CachedClipboard`](crate::clipboard::CachedClipboard)
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key` with no expiry
    fn forever(&self, key: &str, value: Value);

    /// Store `value` under `key` as a member of `tag`
    ///
    /// Backends without tag support store the value untagged.
    fn forever_tagged(&self, _tag: &str, key: &str, value: Value) {
        self.forever(key, value)
    }

    fn forget(&self, key: &str) -> bool;

    /// Drop every key written under `tag`
    ///
    /// Returns `false` when the backend has no tag support and nothing was
    /// flushed.
    fn flush_tag(&self, _tag: &str) -> bool {
        false
    }

    /// Number of live entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local cache on a concurrent map
#[derive(Debug)]
pub struct ArrayStore {
    entries: DashMap<String, Value>,
    tags: DashMap<String, HashSet<String>>,
    tagged: bool,
    writes: AtomicUsize,
}

impl ArrayStore {
    /// Create a store that supports tag flushes
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            tags: DashMap::new(),
            tagged: true,
            writes: AtomicUsize::new(0),
        }
    }

    /// Create a store without tag support
    pub fn without_tags() -> Self {
        Self {
            tagged: false,
            ..Self::new()
        }
    }

    pub fn supports_tags(&self) -> bool {
        self.tagged
    }

    /// Total number of writes since creation
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl Default for ArrayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for ArrayStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn forever(&self, key: &str, value: Value) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key.to_string(), value);
    }

    fn forever_tagged(&self, tag: &str, key: &str, value: Value) {
        if self.tagged {
            self.tags
                .entry(tag.to_string())
                .or_default()
                .insert(key.to_string());
        }
        self.forever(key, value);
    }

    fn forget(&self, key: &str) -> bool {
        for mut members in self.tags.iter_mut() {
            members.remove(key);
        }
        self.entries.remove(key).is_some()
    }

    fn flush_tag(&self, tag: &str) -> bool {
        if !self.tagged {
            return false;
        }

        if let Some((_, members)) = self.tags.remove(tag) {
            for key in members {
                self.entries.remove(&key);
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Entries that failed to deserialize and were recomputed
    pub corrupt: usize,
    pub refreshes: usize,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
