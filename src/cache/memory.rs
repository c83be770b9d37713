use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::cache::cache_key;
use crate::cache::traits::{CacheStats, DecodeCache, StatsCounter};
use crate::errors::{CacheError, CacheResult};

struct Entry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// Process-local cache: least-recently-used eviction past `max_size`,
/// expired entries dropped when next touched.
pub struct MemoryDecodeCache {
    entries: Mutex<LruCache<String, Entry>>,
    max_size: usize,
    counters: StatsCounter,
}

impl MemoryDecodeCache {
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_size: capacity.get(),
            counters: StatsCounter::default(),
        }
    }

    fn entries(&self) -> CacheResult<MutexGuard<'_, LruCache<String, Entry>>> {
        self.entries.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl DecodeCache for MemoryDecodeCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = cache_key(key);
        let now = Instant::now();
        let mut entries = self.entries()?;

        let lookup = entries
            .get(&key)
            .map(|entry| (entry.is_fresh(now), entry.value.clone()));

        match lookup {
            Some((true, value)) => {
                self.counters.hit();
                Ok(Some(value))
            }
            Some((false, _)) => {
                entries.pop(&key);
                self.counters.miss();
                Ok(None)
            }
            None => {
                self.counters.miss();
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries()?.put(cache_key(key), entry);
        self.counters.set();
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        self.entries()?.clear();
        tracing::info!("Memory decode cache cleared");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let size = self
            .entries()
            .map(|entries| entries.iter().filter(|(_, e)| e.is_fresh(now)).count())
            .unwrap_or(0);

        self.counters.snapshot(size, Some(self.max_size))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
