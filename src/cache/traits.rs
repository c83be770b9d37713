use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::errors::CacheResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub size: usize,
    pub max_size: Option<usize>,
    pub hit_rate: f64,
}

/// Decoded-URL cache keyed by the obfuscated URL. Backends hash keys themselves.
pub trait DecodeCache: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
    fn clear(&self) -> CacheResult<()>;
    fn stats(&self) -> CacheStats;
    fn backend(&self) -> &'static str;
}

/// A URL-addressed key-value service shared between processes.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;
    fn delete(&self, key: &str) -> CacheResult<()>;
    fn keys(&self, prefix: &str) -> CacheResult<Vec<String>>;
}

/// Hit/miss/set counters shared by both backends.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize, max_size: Option<usize>) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = (hits + misses).max(1);

        CacheStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            size,
            max_size,
            hit_rate: hits as f64 / lookups as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_without_lookups_is_zero() {
        let counter = StatsCounter::default();
        let stats = counter.snapshot(0, None);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let counter = StatsCounter::default();
        counter.hit();
        counter.hit();
        counter.hit();
        counter.miss();
        counter.set();

        let stats = counter.snapshot(1, Some(10));
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hit_rate, 0.75);
    }
}
