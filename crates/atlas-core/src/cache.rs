//! Session caches for hydrated countries and rank tables
//!
//! The backing store is read-only for the lifetime of a session, so entries
//! are never evicted. Anything that starts writing to the store must call
//! [`SessionCache::invalidate`] or [`SessionCache::clear`] on write.

use ahash::AHashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Unbounded, thread-safe map from keys to shared values.
///
/// Values are handed out as `Arc`s, so two lookups of the same key return the
/// same allocation. Loaders run outside the lock; when two loads race, the
/// first insert wins and both callers observe it.
#[derive(Debug)]
pub struct SessionCache<K, V> {
    entries: RwLock<AHashMap<K, Arc<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> SessionCache<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self { entries: RwLock::new(AHashMap::new()), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    /// Look up a key, counting the hit or miss
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Insert unless present; returns the cached value either way
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert_with(|| Arc::new(value)).clone()
    }

    /// Return the cached value or load, cache and return it
    pub fn get_or_try_insert_with<E>(&self, key: K, load: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = load()?;
        Ok(self.insert(key, value))
    }

    pub fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> Default for SessionCache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { (self.hits as f64 / total as f64) * 100.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_lookups_share_allocation() {
        let cache: SessionCache<String, Vec<u32>> = SessionCache::new();
        let first = cache.insert("a".to_string(), vec![1, 2]);
        let second = cache.get("a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = SessionCache::new();
        cache.insert(1, "one");
        let kept = cache.insert(1, "uno");
        assert_eq!(*kept, "one");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_loader_runs_once() {
        let cache = SessionCache::new();
        let mut loads = 0;
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("k", || {
                    loads += 1;
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: SessionCache<&str, u32> = SessionCache::new();
        assert!(cache.get_or_try_insert_with("k", || Err("boom")).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidation_hooks() {
        let cache = SessionCache::new();
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats() {
        let cache = SessionCache::new();
        cache.insert("a", 1);
        cache.get("a");
        cache.get("a");
        cache.get("b");
        cache.get("c");

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate(), 50.0);
        assert_eq!(SessionCache::<u8, u8>::new().stats().hit_rate(), 0.0);
    }
}
