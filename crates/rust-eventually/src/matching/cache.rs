//! Regex cache for patterns rebuilt inside poll loops.
//!
//! Poll producers often rebuild the same regex on every attempt (for
//! example a trace-id pattern interpolated from a request header). The cache
//! keeps compiled expressions keyed by their source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use regex::Regex;

/// Default maximum cache size.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Process-wide cache used by [`Pattern::regex`](super::Pattern::regex).
pub static GLOBAL_CACHE: LazyLock<RegexCache> = LazyLock::new(RegexCache::with_default_size);

/// A cache for compiled regular expressions.
///
/// The oldest inserted entry is evicted when the cache is full.
pub struct RegexCache {
    cache: RwLock<Entries>,
    max_size: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Arc<Regex>>,
    order: Vec<String>,
}

impl RegexCache {
    /// Create a new regex cache with the specified maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: RwLock::new(Entries::default()),
            max_size: max_size.max(1),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Create a new regex cache with default size.
    #[must_use]
    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }

    /// Get or compile a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.map.get(pattern) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(regex));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let regex = Arc::new(Regex::new(pattern)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have inserted while we compiled.
        if let Some(existing) = cache.map.get(pattern) {
            return Ok(Arc::clone(existing));
        }
        if cache.map.len() >= self.max_size && !cache.order.is_empty() {
            let oldest = cache.order.remove(0);
            cache.map.remove(&oldest);
        }
        cache.map.insert(pattern.to_string(), Arc::clone(&regex));
        cache.order.push(pattern.to_string());

        Ok(regex)
    }

    /// Check if a pattern is cached.
    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .contains_key(pattern)
    }

    /// Get the current number of cached patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached patterns.
    pub size: usize,
    /// Maximum cache size.
    pub max_size: usize,
    /// Lookups served from the cache.
    pub hits: usize,
    /// Lookups that compiled a new regex.
    pub misses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lookup_hits() {
        let cache = RegexCache::new(10);
        let a = cache.get_or_compile(r"\d+").unwrap();
        let b = cache.get_or_compile(r"\d+").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn evicts_oldest() {
        let cache = RegexCache::new(2);
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        cache.get_or_compile("c").unwrap();
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalid_pattern_is_not_cached() {
        let cache = RegexCache::new(2);
        assert!(cache.get_or_compile("[invalid").is_err());
        assert!(cache.is_empty());
    }
}
