use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Candidate;

/// Final item handed to feed serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    pub fn new(title: String, link: String) -> Self {
        Self {
            title,
            link,
            description: None,
            published_at: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_published(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }
}

impl From<&Candidate> for FeedItem {
    fn from(candidate: &Candidate) -> Self {
        FeedItem::new(candidate.title.clone(), candidate.link.clone())
            .with_description(candidate.description.clone())
            .with_published(candidate.published_at)
    }
}

/// A whole synthesized feed: page metadata plus its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedFeed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<FeedItem>,
    pub generated_at: DateTime<Utc>,
}
