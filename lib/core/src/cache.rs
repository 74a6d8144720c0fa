//! Bounded LRU cache shared by all matchers.
//!
//! Every matcher keeps its derived per-field data (profiles, term vectors,
//! embeddings) in a [`BoundedCache`]. Entries are evicted least-recently-used
//! first and the whole cache is cleared between independent requests.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Key/value store that never holds more than `capacity` entries.
///
/// A capacity of zero disables caching: lookups always miss and inserts
/// are dropped.
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Option<LruCache<K, V>>,
    capacity: usize,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
            capacity,
        }
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a value, marking it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.inner.as_mut()?.get(key).cloned()
    }

    /// Check presence without touching the recency order.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.inner.as_ref().is_some_and(|cache| cache.contains(key))
    }

    pub fn insert(&mut self, key: K, value: V) {
        if let Some(cache) = self.inner.as_mut() {
            cache.put(key, value);
        }
    }

    /// Return the cached value or compute, store and return it.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.inner.as_mut() {
            cache.clear();
        }
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("len", &self.inner.as_ref().map_or(0, LruCache::len))
            .finish()
    }
}
