pub mod external;
pub mod memory;
pub mod redis_store;
pub mod traits;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::{CacheOptions, CacheType};

pub use external::ExternalDecodeCache;
pub use memory::MemoryDecodeCache;
pub use redis_store::RedisStore;
pub use traits::{CacheStats, DecodeCache, KeyValueStore};

const EXTERNAL_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// What makes two cache configurations the same cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheIdentity {
    cache_type: CacheType,
    max_size: usize,
    redis_url: String,
    key_prefix: String,
}

impl From<&CacheOptions> for CacheIdentity {
    fn from(options: &CacheOptions) -> Self {
        Self {
            cache_type: options.cache_type,
            max_size: options.cache_max_size,
            redis_url: options.redis_url.clone(),
            key_prefix: options.redis_key_prefix.clone(),
        }
    }
}

static SHARED_CACHES: Lazy<Mutex<HashMap<CacheIdentity, Arc<dyn DecodeCache>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Stable cache key for an obfuscated URL: host, path and query hashed
/// with SHA-256, truncated to 32 hex chars. Scheme and fragment are ignored.
pub fn cache_key(url: &str) -> String {
    let normalized = match Url::parse(url) {
        Ok(parsed) => {
            let mut key = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());
            if let Some(query) = parsed.query() {
                key.push('?');
                key.push_str(query);
            }
            key
        }
        Err(_) => url.to_string(),
    };

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

/// Build the configured backend. `None` when caching is disabled.
/// An unreachable external store degrades to the memory backend.
pub fn build_cache(options: &CacheOptions) -> Option<Arc<dyn DecodeCache>> {
    if !options.cache_enabled {
        return None;
    }

    let memory = || -> Arc<dyn DecodeCache> {
        tracing::info!(
            max_size = options.cache_max_size,
            ttl_secs = options.cache_ttl.as_secs(),
            "Using memory decode cache"
        );
        Arc::new(MemoryDecodeCache::new(options.cache_max_size))
    };

    match options.cache_type {
        CacheType::Memory => Some(memory()),
        CacheType::External => match RedisStore::connect(&options.redis_url, EXTERNAL_STORE_TIMEOUT) {
            Ok(store) => {
                tracing::info!(prefix = %options.redis_key_prefix, "Using external decode cache");
                Some(Arc::new(ExternalDecodeCache::new(
                    Box::new(store),
                    options.redis_key_prefix.clone(),
                )))
            }
            Err(e) => {
                tracing::warn!("External cache unavailable ({}), falling back to memory", e);
                Some(memory())
            }
        },
    }
}

/// The process-wide cache for these options, built on first use and handed to
/// every later caller with the same configuration. `None` when caching is disabled.
pub fn shared_cache(options: &CacheOptions) -> Option<Arc<dyn DecodeCache>> {
    if !options.cache_enabled {
        return None;
    }

    let identity = CacheIdentity::from(options);
    let mut caches = SHARED_CACHES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(cache) = caches.get(&identity) {
        return Some(Arc::clone(cache));
    }

    let cache = build_cache(options)?;
    caches.insert(identity, Arc::clone(&cache));
    Some(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_and_short() {
        let a = cache_key("https://news.example-aggregator/articles/abc?hl=en");
        let b = cache_key("http://news.example-aggregator/articles/abc?hl=en#frag");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_distinguishes_query() {
        assert_ne!(
            cache_key("https://news.example-aggregator/articles/abc?hl=en"),
            cache_key("https://news.example-aggregator/articles/abc?hl=de")
        );
    }

    #[test]
    fn test_disabled_builds_nothing() {
        let options = CacheOptions {
            cache_enabled: false,
            ..CacheOptions::default()
        };
        assert!(build_cache(&options).is_none());
    }

    #[test]
    fn test_memory_backend_selected() {
        let cache = build_cache(&CacheOptions::default()).unwrap();
        assert_eq!(cache.backend(), "memory");
        assert_eq!(cache.stats().max_size, Some(1000));
    }

    #[test]
    fn test_shared_cache_is_reused_per_configuration() {
        let options = CacheOptions {
            cache_max_size: 311,
            ..CacheOptions::default()
        };
        let a = shared_cache(&options).unwrap();
        let b = shared_cache(&options).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let url = "https://news.example-aggregator/articles/S1";
        a.set(url, "https://dest.example/1", Duration::from_secs(60)).unwrap();
        assert_eq!(b.get(url).unwrap().as_deref(), Some("https://dest.example/1"));

        let other = shared_cache(&CacheOptions {
            cache_max_size: 312,
            ..CacheOptions::default()
        })
        .unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn test_shared_cache_disabled_is_none() {
        let options = CacheOptions {
            cache_enabled: false,
            ..CacheOptions::default()
        };
        assert!(shared_cache(&options).is_none());
    }

    #[test]
    fn test_unreachable_external_falls_back_to_memory() {
        let options = CacheOptions {
            cache_type: CacheType::External,
            redis_url: "redis://127.0.0.1:1/0".to_string(),
            ..CacheOptions::default()
        };
        let cache = build_cache(&options).unwrap();
        assert_eq!(cache.backend(), "memory");
    }
}
