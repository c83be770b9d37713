use serde::{Deserialize, Serialize};

use crate::errors::DecodeFailure;

/// Why a decode request handed back the original URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum UnchangedReason {
    /// The URL is not one the decoder knows how to unwrap.
    NotObfuscated,
    /// Decoding is switched off in the options.
    Disabled,
    /// No decode upstream was configured, or it reported itself unusable.
    UpstreamUnavailable(String),
    /// Every attempt failed with a transient error; holds the last one.
    RetriesExhausted(String),
    /// A previous failure for this URL is still cached.
    CachedFailure,
}

impl std::fmt::Display for UnchangedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnchangedReason::NotObfuscated => write!(f, "not an obfuscated URL"),
            UnchangedReason::Disabled => write!(f, "decoding disabled"),
            UnchangedReason::UpstreamUnavailable(detail) => {
                write!(f, "decode upstream unavailable: {}", detail)
            }
            UnchangedReason::RetriesExhausted(detail) => {
                write!(f, "retries exhausted: {}", detail)
            }
            UnchangedReason::CachedFailure => write!(f, "cached failure"),
        }
    }
}

impl From<&DecodeFailure> for UnchangedReason {
    fn from(failure: &DecodeFailure) -> Self {
        match failure {
            DecodeFailure::Unavailable(detail) => {
                UnchangedReason::UpstreamUnavailable(detail.clone())
            }
            other => UnchangedReason::RetriesExhausted(other.to_string()),
        }
    }
}

/// Outcome of a decode request. `Unchanged` is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DecodeOutcome {
    Decoded { url: String },
    Unchanged { url: String, reason: UnchangedReason },
}

impl DecodeOutcome {
    pub fn decoded(url: impl Into<String>) -> Self {
        DecodeOutcome::Decoded { url: url.into() }
    }

    pub fn unchanged(url: impl Into<String>, reason: UnchangedReason) -> Self {
        DecodeOutcome::Unchanged {
            url: url.into(),
            reason,
        }
    }

    /// The URL to use downstream: decoded destination or the untouched original.
    pub fn url(&self) -> &str {
        match self {
            DecodeOutcome::Decoded { url } | DecodeOutcome::Unchanged { url, .. } => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            DecodeOutcome::Decoded { url } | DecodeOutcome::Unchanged { url, .. } => url,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, DecodeOutcome::Decoded { .. })
    }
}
