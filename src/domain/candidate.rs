use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which extraction heuristic produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    HeadingLink,
    CardElement,
    ContentBlock,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::HeadingLink => "heading_link",
            StrategyKind::CardElement => "card_element",
            StrategyKind::ContentBlock => "content_block",
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "heading_link" | "heading" => Ok(StrategyKind::HeadingLink),
            "card_element" | "card" => Ok(StrategyKind::CardElement),
            "content_block" | "content" => Ok(StrategyKind::ContentBlock),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An extracted (title, link) pair. The link is already absolute and normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub source_strategy: StrategyKind,
    pub score: f64,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(title: String, link: String, source_strategy: StrategyKind) -> Self {
        Self {
            title,
            link,
            source_strategy,
            score: 0.0,
            description: None,
            published_at: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    pub fn with_published(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Case-folded, whitespace-collapsed title used as the deduplication key.
    pub fn dedup_key(&self) -> String {
        self.title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
