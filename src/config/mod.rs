use std::str::FromStr;
use std::time::Duration;

use crate::errors::{FeedgenError, FeedgenResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheType {
    Memory,
    External,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::Memory => "memory",
            CacheType::External => "external",
        }
    }
}

impl FromStr for CacheType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(CacheType::Memory),
            "external" | "redis" => Ok(CacheType::External),
            _ => Err(format!("Unknown cache type: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub cache_enabled: bool,
    pub cache_type: CacheType,
    pub cache_ttl: Duration,
    pub cache_max_size: usize,
    pub redis_url: String,
    pub redis_key_prefix: String,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_type: CacheType::Memory,
            cache_ttl: Duration::from_secs(86_400),
            cache_max_size: 1000,
            redis_url: "redis://localhost:6379/0".to_string(),
            redis_key_prefix: "feedgen:decode:".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecoderOptions {
    pub decode_enabled: bool,
    /// Minimum gap between two upstream calls, shared by every caller.
    pub request_interval: Duration,
    pub request_timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Extra wait before the first retry, doubled for each later one.
    pub retry_backoff: Duration,
    pub enable_logging: bool,
    /// When set, fallback outcomes are cached for this long.
    pub negative_cache_ttl: Option<Duration>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            decode_enabled: false,
            request_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            enable_logging: true,
            negative_cache_ttl: None,
        }
    }
}

/// Everything the pipeline needs, built once and never mutated.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub max_items: usize,
    /// A strategy yielding fewer candidates than this hands over to the next one.
    pub min_viable_candidates: usize,
    pub user_agent: String,
    pub fetch_timeout: Duration,
    pub decoder: DecoderOptions,
    pub cache: CacheOptions,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_items: 20,
            min_viable_candidates: 3,
            user_agent: "feedgen/1.0".to_string(),
            fetch_timeout: Duration::from_secs(30),
            decoder: DecoderOptions::default(),
            cache: CacheOptions::default(),
        }
    }
}

impl SynthesisOptions {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Load options from `FEEDGEN_*` environment variables, after reading any `.env` file.
    pub fn from_env() -> FeedgenResult<Self> {
        // Try to load .env from executable's directory first
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build options from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> FeedgenResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let decoder_defaults = DecoderOptions::default();
        let cache_defaults = CacheOptions::default();

        let decoder = DecoderOptions {
            decode_enabled: parse_or(&lookup, "FEEDGEN_DECODE_ENABLED", decoder_defaults.decode_enabled)?,
            request_interval: secs_or(&lookup, "FEEDGEN_REQUEST_INTERVAL", decoder_defaults.request_interval)?,
            request_timeout: secs_or(&lookup, "FEEDGEN_REQUEST_TIMEOUT", decoder_defaults.request_timeout)?,
            max_retries: parse_or(&lookup, "FEEDGEN_MAX_RETRIES", decoder_defaults.max_retries)?,
            retry_backoff: secs_or(&lookup, "FEEDGEN_RETRY_BACKOFF", decoder_defaults.retry_backoff)?,
            enable_logging: parse_or(&lookup, "FEEDGEN_ENABLE_LOGGING", decoder_defaults.enable_logging)?,
            negative_cache_ttl: match lookup("FEEDGEN_NEGATIVE_CACHE_TTL") {
                Some(raw) => Some(parse_secs("FEEDGEN_NEGATIVE_CACHE_TTL", &raw)?),
                None => None,
            },
        };

        let cache = CacheOptions {
            cache_enabled: parse_or(&lookup, "FEEDGEN_CACHE_ENABLED", cache_defaults.cache_enabled)?,
            cache_type: parse_or(&lookup, "FEEDGEN_CACHE_TYPE", cache_defaults.cache_type)?,
            cache_ttl: secs_or(&lookup, "FEEDGEN_CACHE_TTL", cache_defaults.cache_ttl)?,
            cache_max_size: parse_or(&lookup, "FEEDGEN_CACHE_MAX_SIZE", cache_defaults.cache_max_size)?,
            redis_url: lookup("FEEDGEN_REDIS_URL").unwrap_or(cache_defaults.redis_url),
            redis_key_prefix: lookup("FEEDGEN_REDIS_KEY_PREFIX")
                .unwrap_or(cache_defaults.redis_key_prefix),
        };

        let options = Self {
            max_items: parse_or(&lookup, "FEEDGEN_MAX_ITEMS", defaults.max_items)?,
            min_viable_candidates: parse_or(
                &lookup,
                "FEEDGEN_MIN_VIABLE_CANDIDATES",
                defaults.min_viable_candidates,
            )?,
            user_agent: lookup("FEEDGEN_USER_AGENT").unwrap_or(defaults.user_agent),
            fetch_timeout: secs_or(&lookup, "FEEDGEN_FETCH_TIMEOUT", defaults.fetch_timeout)?,
            decoder,
            cache,
        };

        if options.cache.cache_max_size == 0 {
            return Err(FeedgenError::Config(
                "FEEDGEN_CACHE_MAX_SIZE must be at least 1".to_string(),
            ));
        }

        Ok(options)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> FeedgenResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| FeedgenError::Config(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> FeedgenResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_secs(key, &raw),
        None => Ok(default),
    }
}

/// Seconds, fractional allowed ("0.25").
fn parse_secs(key: &str, raw: &str) -> FeedgenResult<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| FeedgenError::Config(format!("{}: {}", key, e)))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| FeedgenError::Config(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = SynthesisOptions::from_lookup(|_| None).unwrap();

        assert_eq!(options.max_items, 20);
        assert!(!options.decoder.decode_enabled);
        assert_eq!(options.decoder.request_interval, Duration::from_secs(1));
        assert_eq!(options.decoder.request_timeout, Duration::from_secs(10));
        assert_eq!(options.decoder.max_retries, 3);
        assert!(options.decoder.enable_logging);
        assert!(options.decoder.negative_cache_ttl.is_none());
        assert!(options.cache.cache_enabled);
        assert_eq!(options.cache.cache_type, CacheType::Memory);
        assert_eq!(options.cache.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(options.cache.cache_max_size, 1000);
    }

    #[test]
    fn test_overrides() {
        let options = SynthesisOptions::from_lookup(lookup_from(&[
            ("FEEDGEN_MAX_ITEMS", "5"),
            ("FEEDGEN_DECODE_ENABLED", "true"),
            ("FEEDGEN_REQUEST_INTERVAL", "0.25"),
            ("FEEDGEN_CACHE_TYPE", "redis"),
            ("FEEDGEN_REDIS_KEY_PREFIX", "test:"),
            ("FEEDGEN_NEGATIVE_CACHE_TTL", "60"),
        ]))
        .unwrap();

        assert_eq!(options.max_items, 5);
        assert!(options.decoder.decode_enabled);
        assert_eq!(options.decoder.request_interval, Duration::from_millis(250));
        assert_eq!(options.cache.cache_type, CacheType::External);
        assert_eq!(options.cache.redis_key_prefix, "test:");
        assert_eq!(options.decoder.negative_cache_ttl, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let result = SynthesisOptions::from_lookup(lookup_from(&[("FEEDGEN_MAX_ITEMS", "many")]));
        assert!(matches!(result, Err(FeedgenError::Config(_))));

        let result =
            SynthesisOptions::from_lookup(lookup_from(&[("FEEDGEN_REQUEST_INTERVAL", "-1")]));
        assert!(matches!(result, Err(FeedgenError::Config(_))));
    }

    #[test]
    fn test_huge_ttl_is_usable_by_memory_cache() {
        use crate::cache::{DecodeCache, MemoryDecodeCache};

        let options = SynthesisOptions::from_lookup(lookup_from(&[
            ("FEEDGEN_CACHE_TTL", "1e19"),
            ("FEEDGEN_NEGATIVE_CACHE_TTL", "1e19"),
        ]))
        .unwrap();

        let cache = MemoryDecodeCache::new(options.cache.cache_max_size);
        cache
            .set("https://a.example/1", "https://dest.example/1", options.cache.cache_ttl)
            .unwrap();
        let negative_ttl = options.decoder.negative_cache_ttl.unwrap();
        cache.set("https://a.example/2", "https://dest.example/2", negative_ttl).unwrap();
        assert!(cache.get("https://a.example/1").unwrap().is_some());
    }

    #[test]
    fn test_zero_cache_size_rejected() {
        let result =
            SynthesisOptions::from_lookup(lookup_from(&[("FEEDGEN_CACHE_MAX_SIZE", "0")]));
        assert!(matches!(result, Err(FeedgenError::Config(_))));
    }
}
