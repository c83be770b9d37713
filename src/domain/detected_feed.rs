use serde::{Deserialize, Serialize};

/// Syndication format advertised by a page or guessed from a feed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Rss,
    Atom,
    Json,
    Xml,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Rss => "rss",
            FeedKind::Atom => "atom",
            FeedKind::Json => "json",
            FeedKind::Xml => "xml",
        }
    }

    /// Kind for a `<link type=...>` media type, `None` when it is not a feed type.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let media_type = media_type.trim().to_lowercase();
        let is_feed = [
            "application/rss+xml",
            "application/atom+xml",
            "application/xml",
            "text/xml",
            "application/json",
            "application/feed+json",
        ]
        .iter()
        .any(|known| media_type.contains(known));
        if !is_feed {
            return None;
        }

        Some(if media_type.contains("rss") {
            FeedKind::Rss
        } else if media_type.contains("atom") {
            FeedKind::Atom
        } else if media_type.contains("json") {
            FeedKind::Json
        } else {
            FeedKind::Xml
        })
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A native feed the site already publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedFeed {
    pub url: String,
    pub title: String,
    pub kind: FeedKind,
}
