//! Keyed response caches for the Botpress client.
//!
//! The client keeps two short-lived caches: conversation metadata and
//! per-conversation message lists. Both are instances of [`KeyedCache`], a
//! small store with explicit `get`/`put`/`invalidate`/`clear` operations so
//! the invalidation contract lives in the type instead of caller discipline.
//!
//! Invalidation triggers:
//! - message-list entries are evicted whenever a message is sent in that
//!   conversation, and may be bypassed per fetch;
//! - conversation metadata is populated lazily and never proactively
//!   invalidated (accepted staleness);
//! - everything is cleared wholesale when the client closes.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A keyed store for one category of cached responses.
///
/// Values are cloned out on `get`; the cache itself is never exposed by
/// reference. One instance belongs to exactly one client and is mutated only
/// by the operation that owns the key's lifecycle.
#[derive(Debug, Default)]
pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> KeyedCache<K, V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a clone of the cached value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        lock(&self.entries).get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: K, value: V) {
        lock(&self.entries).insert(key, value);
    }

    /// Removes the entry for `key`, returning it if one existed.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        lock(&self.entries).remove(key)
    }

    /// Returns true if an entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        lock(&self.entries).contains_key(key)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let cache = KeyedCache::new();
        cache.put("conv-1".to_string(), vec![1, 2, 3]);
        assert_eq!(cache.get(&"conv-1".to_string()), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(&"conv-2".to_string()), None);
    }

    #[test]
    fn put_replaces() {
        let cache = KeyedCache::new();
        cache.put("conv-1".to_string(), vec![1]);
        cache.put("conv-1".to_string(), vec![2]);
        assert_eq!(cache.get(&"conv-1".to_string()), Some(vec![2]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_removes_only_that_key() {
        let cache = KeyedCache::new();
        cache.put("a".to_string(), 1u32);
        cache.put("b".to_string(), 2u32);
        assert_eq!(cache.invalidate(&"a".to_string()), Some(1));
        assert_eq!(cache.invalidate(&"a".to_string()), None);
        assert!(cache.contains(&"b".to_string()));
    }

    #[test]
    fn clear_empties() {
        let cache = KeyedCache::new();
        cache.put("a".to_string(), 1u32);
        cache.put("b".to_string(), 2u32);
        cache.clear();
        assert!(cache.is_empty());
    }
}
