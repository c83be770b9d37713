pub mod assembler;
pub mod feed_detector;
pub mod fetch_service;
pub mod synthesis_service;

pub use assembler::{assemble, dedupe};
pub use feed_detector::{detect_feeds, scan_common_paths, COMMON_FEED_PATHS};
pub use fetch_service::{FetchedPage, Fetcher, HttpFetcher};
pub use synthesis_service::{synthesize_feed, SynthesisService};
