pub mod candidate;
pub mod decode;
pub mod detected_feed;
pub mod feed_item;
pub mod link;

pub use candidate::{Candidate, StrategyKind};
pub use decode::{DecodeOutcome, UnchangedReason};
pub use detected_feed::{DetectedFeed, FeedKind};
pub use feed_item::{FeedItem, SynthesizedFeed};
pub use link::NormalizedLink;
