use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{shared_cache, CacheStats, DecodeCache};
use crate::config::{DecoderOptions, SynthesisOptions};
use crate::decoder::http::HttpDecodeUpstream;
use crate::decoder::throttle::Throttle;
use crate::decoder::upstream::DecodeUpstream;
use crate::domain::{DecodeOutcome, UnchangedReason};
use crate::errors::{CacheResult, DecodeFailure};
use crate::normalizers::aggregator::is_obfuscated;

/// Cached in place of a destination when a fallback outcome is remembered.
const NEGATIVE_MARKER: &str = "\u{0}unchanged";

enum CacheLookup {
    Hit(String),
    Failure,
    Miss,
}

/// Resolves obfuscated aggregator links to their destinations.
///
/// Per request: cache check, throttle, attempt, classify, and on failure fall
/// back to the original URL. `decode` never returns an error.
pub struct UrlDecoder {
    options: DecoderOptions,
    upstream: Option<Arc<dyn DecodeUpstream>>,
    cache: Option<Arc<dyn DecodeCache>>,
    cache_ttl: Duration,
    throttle: Arc<Throttle>,
}

impl UrlDecoder {
    /// A decoder with no upstream and no cache, spaced by the process-wide
    /// throttle for its interval. Every obfuscated URL falls back until an
    /// upstream or a warm cache is attached.
    pub fn new(options: DecoderOptions) -> Self {
        let throttle = Throttle::process_wide(options.request_interval);
        Self {
            options,
            upstream: None,
            cache: None,
            cache_ttl: Duration::ZERO,
            throttle,
        }
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn DecodeUpstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn DecodeCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Share a throttle with other decoders so their upstream calls are spaced together.
    pub fn with_throttle(mut self, throttle: Arc<Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Wire the HTTP upstream and the process-wide cache for the configured backend.
    /// Decoders built from equal options share their throttle and cache.
    /// `None` when decoding is disabled.
    pub fn from_options(options: &SynthesisOptions) -> Option<Self> {
        if !options.decoder.decode_enabled {
            return None;
        }

        let mut decoder = Self::new(options.decoder.clone());

        match HttpDecodeUpstream::new(&options.user_agent) {
            Ok(upstream) => decoder = decoder.with_upstream(Arc::new(upstream)),
            Err(e) => warn!("Decode upstream unavailable, links stay unchanged: {}", e),
        }

        if let Some(cache) = shared_cache(&options.cache) {
            decoder = decoder.with_cache(cache, options.cache.cache_ttl);
        }

        Some(decoder)
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn throttle(&self) -> Arc<Throttle> {
        Arc::clone(&self.throttle)
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    pub fn clear_cache(&self) -> CacheResult<()> {
        match &self.cache {
            Some(cache) => cache.clear(),
            None => Ok(()),
        }
    }

    pub fn decode(&self, url: &str) -> DecodeOutcome {
        if !self.options.decode_enabled {
            return DecodeOutcome::unchanged(url, UnchangedReason::Disabled);
        }

        if !is_obfuscated(url) {
            return DecodeOutcome::unchanged(url, UnchangedReason::NotObfuscated);
        }

        match self.lookup(url) {
            CacheLookup::Hit(decoded) => {
                if self.options.enable_logging {
                    debug!(url, "Decode cache hit");
                }
                return DecodeOutcome::decoded(decoded);
            }
            CacheLookup::Failure => {
                return DecodeOutcome::unchanged(url, UnchangedReason::CachedFailure);
            }
            CacheLookup::Miss => {}
        }

        let Some(upstream) = &self.upstream else {
            return DecodeOutcome::unchanged(
                url,
                UnchangedReason::UpstreamUnavailable("no decode upstream configured".to_string()),
            );
        };

        let attempts = self.options.max_retries.saturating_add(1);
        let mut last_failure = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                thread::sleep(self.backoff(attempt));
            }
            self.throttle.wait();

            let result = upstream
                .decode_once(url, self.options.request_timeout)
                .and_then(|decoded| validate_destination(url, decoded));

            match result {
                Ok(decoded) => {
                    if self.options.enable_logging {
                        info!(url, decoded = %decoded, attempt, "Decoded obfuscated URL");
                    }
                    self.store(url, &decoded, self.cache_ttl);
                    return DecodeOutcome::decoded(decoded);
                }
                Err(failure) if !failure.is_retryable() => {
                    if self.options.enable_logging {
                        warn!(url, "Decode upstream unusable: {}", failure);
                    }
                    return DecodeOutcome::unchanged(url, UnchangedReason::from(&failure));
                }
                Err(failure) => {
                    if self.options.enable_logging {
                        warn!(url, attempt, attempts, "Decode attempt failed: {}", failure);
                    }
                    last_failure = Some(failure);
                }
            }
        }

        if let Some(ttl) = self.options.negative_cache_ttl {
            self.store(url, NEGATIVE_MARKER, ttl);
        }

        let reason = match &last_failure {
            Some(failure) => UnchangedReason::from(failure),
            None => UnchangedReason::RetriesExhausted("no attempt made".to_string()),
        };
        if self.options.enable_logging {
            warn!(url, "Keeping obfuscated URL: {}", reason);
        }
        DecodeOutcome::unchanged(url, reason)
    }

    /// Decode in order. Calls are spaced by the shared throttle.
    pub fn decode_all<I, S>(&self, urls: I) -> Vec<DecodeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter().map(|url| self.decode(url.as_ref())).collect()
    }

    fn lookup(&self, url: &str) -> CacheLookup {
        let Some(cache) = &self.cache else {
            return CacheLookup::Miss;
        };

        match cache.get(url) {
            Ok(Some(value)) if value == NEGATIVE_MARKER => CacheLookup::Failure,
            Ok(Some(value)) => CacheLookup::Hit(value),
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                if self.options.enable_logging {
                    warn!(url, "Decode cache read failed, treating as miss: {}", e);
                }
                CacheLookup::Miss
            }
        }
    }

    fn store(&self, url: &str, value: &str, ttl: Duration) {
        let Some(cache) = &self.cache else {
            return;
        };

        if let Err(e) = cache.set(url, value, ttl) {
            if self.options.enable_logging {
                warn!(url, "Decode cache write failed: {}", e);
            }
        }
    }

    /// Wait before `attempt` (2 or later): the base backoff, doubled per extra retry.
    fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(2).min(16);
        self.options.retry_backoff.saturating_mul(1 << doublings)
    }
}

/// An upstream answer counts only if it is a web URL other than the input.
fn validate_destination(original: &str, decoded: String) -> Result<String, DecodeFailure> {
    let decoded = decoded.trim().to_string();
    if decoded.is_empty() || decoded == original {
        return Err(DecodeFailure::BadRequest(
            "upstream returned no new destination".to_string(),
        ));
    }

    match Url::parse(&decoded) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(decoded),
        _ => Err(DecodeFailure::BadRequest(format!(
            "upstream returned an invalid destination: {}",
            decoded
        ))),
    }
}
