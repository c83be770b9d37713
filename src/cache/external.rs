use std::time::Duration;

use crate::cache::cache_key;
use crate::cache::traits::{CacheStats, DecodeCache, KeyValueStore, StatsCounter};
use crate::errors::CacheResult;

/// Cache backed by a shared key-value store so several server instances
/// reuse each other's decodes. Entry expiry is delegated to the store.
pub struct ExternalDecodeCache {
    store: Box<dyn KeyValueStore>,
    key_prefix: String,
    counters: StatsCounter,
}

impl ExternalDecodeCache {
    pub fn new(store: Box<dyn KeyValueStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            counters: StatsCounter::default(),
        }
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, cache_key(key))
    }
}

impl DecodeCache for ExternalDecodeCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self.store.get(&self.store_key(key)) {
            Ok(Some(value)) if !value.is_empty() => {
                self.counters.hit();
                Ok(Some(value))
            }
            Ok(_) => {
                self.counters.miss();
                Ok(None)
            }
            Err(e) => {
                self.counters.miss();
                Err(e)
            }
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.store.set(&self.store_key(key), value, ttl)?;
        self.counters.set();
        Ok(())
    }

    fn clear(&self) -> CacheResult<()> {
        let keys = self.store.keys(&self.key_prefix)?;
        for key in &keys {
            self.store.delete(key)?;
        }
        tracing::info!(removed = keys.len(), "External decode cache cleared");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        let size = match self.store.keys(&self.key_prefix) {
            Ok(keys) => keys.len(),
            Err(e) => {
                tracing::warn!("Cannot count external cache keys: {}", e);
                0
            }
        };

        self.counters.snapshot(size, None)
    }

    fn backend(&self) -> &'static str {
        "external"
    }
}
