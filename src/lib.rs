//! Finds the native feeds a site publishes, and turns web pages without one into an ordered, deduplicated list of
//! feed items: heuristic extraction, site-aware link normalization, and throttled,
//! cached decoding of obfuscated aggregator links.

pub mod cache;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod normalizers;
pub mod services;

pub use config::SynthesisOptions;
pub use decoder::UrlDecoder;
pub use domain::{
    Candidate, DecodeOutcome, DetectedFeed, FeedItem, NormalizedLink, SynthesizedFeed,
};
pub use errors::{FeedgenError, FeedgenResult};
pub use normalizers::NormalizerRegistry;
pub use services::{synthesize_feed, SynthesisService};
