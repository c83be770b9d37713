use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedgenError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Request-level errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTML parsing failed: {0}")]
    Parse(String),

    // Candidate-level errors, absorbed by the extractor
    #[error("Cannot normalize link '{link}': {reason}")]
    Normalization { link: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedgenError {
    pub fn normalization(link: &str, reason: impl Into<String>) -> Self {
        FeedgenError::Normalization {
            link: link.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FeedgenResult<T> = Result<T, FeedgenError>;

/// Failure talking to a decode cache backend. Never fatal: callers treat it as a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache lock poisoned")]
    Poisoned,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Typed failure of a single upstream decode call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("upstream rate limited the request")]
    RateLimited,

    #[error("upstream rejected the request: {0}")]
    BadRequest(String),

    #[error("upstream redirected to a bot check")]
    BotBlocked,

    #[error("upstream call timed out")]
    Timeout,

    #[error("decode upstream unavailable: {0}")]
    Unavailable(String),
}

impl DecodeFailure {
    /// Everything except a missing upstream is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DecodeFailure::Unavailable(_))
    }
}
