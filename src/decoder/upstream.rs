use std::time::Duration;

use crate::errors::DecodeFailure;

/// One attempt at resolving an obfuscated URL into its destination.
#[cfg_attr(test, mockall::automock)]
pub trait DecodeUpstream: Send + Sync {
    fn decode_once(&self, url: &str, timeout: Duration) -> Result<String, DecodeFailure>;
}
