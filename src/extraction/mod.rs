pub mod card;
pub mod content_block;
pub mod heading;
pub mod metadata;
pub mod strategy;
pub mod text;

use scraper::Html;
use tracing::debug;
use url::Url;

use crate::config::SynthesisOptions;
use crate::domain::{Candidate, StrategyKind};
use crate::errors::{FeedgenError, FeedgenResult};
use crate::normalizers::NormalizerRegistry;

pub use card::CardElementStrategy;
pub use content_block::ContentBlockStrategy;
pub use heading::HeadingLinkStrategy;
pub use metadata::{extract_metadata, PageMetadata};
pub use strategy::{ExtractionStrategy, PageContext};

/// Parse raw HTML into a tree. Only input with no content at all is unusable;
/// the parser recovers from any malformed markup.
pub fn parse_document(raw: &str) -> FeedgenResult<Html> {
    if raw.trim().is_empty() {
        return Err(FeedgenError::Parse("document is empty".to_string()));
    }
    Ok(Html::parse_document(raw))
}

/// Result of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub candidates: Vec<Candidate>,
    /// Strategy whose output was kept; `None` when nothing was found.
    pub strategy_used: Option<StrategyKind>,
    /// Strategies that actually ran, in order.
    pub attempted: Vec<StrategyKind>,
}

pub struct ContentExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    min_viable: usize,
    candidate_limit: usize,
}

impl ContentExtractor {
    pub fn new(min_viable: usize, candidate_limit: usize) -> Self {
        let mut extractor = Self::empty(min_viable, candidate_limit);

        // Priority order: the first strategy with enough output wins
        extractor.register(Box::new(HeadingLinkStrategy::new()));
        extractor.register(Box::new(CardElementStrategy::new()));
        extractor.register(Box::new(ContentBlockStrategy::new()));

        extractor
    }

    /// Each strategy may return up to twice `max_items`, leaving room for deduplication.
    pub fn from_options(options: &SynthesisOptions) -> Self {
        let limit = options
            .max_items
            .saturating_mul(2)
            .max(options.min_viable_candidates);
        Self::new(options.min_viable_candidates, limit)
    }

    pub fn empty(min_viable: usize, candidate_limit: usize) -> Self {
        Self {
            strategies: Vec::new(),
            // A threshold of zero would accept an empty first strategy
            min_viable: min_viable.max(1),
            candidate_limit,
        }
    }

    pub fn register(&mut self, strategy: Box<dyn ExtractionStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run strategies in priority order until one yields at least the minimum
    /// viable count; its output is used alone. When none does, the non-empty
    /// output with the highest total score is used.
    pub fn extract(&self, document: &Html, base: &Url, registry: &NormalizerRegistry) -> Extraction {
        let page = PageContext::new(base, registry, self.candidate_limit);
        let mut attempted = Vec::new();
        let mut best: Option<(f64, Vec<Candidate>, StrategyKind)> = None;

        for strategy in &self.strategies {
            let kind = strategy.kind();
            attempted.push(kind);

            let candidates = strategy.extract(document, &page);
            debug!(strategy = %kind, count = candidates.len(), "Extraction strategy finished");

            if candidates.len() >= self.min_viable {
                return Extraction {
                    candidates,
                    strategy_used: Some(kind),
                    attempted,
                };
            }

            if candidates.is_empty() {
                continue;
            }

            let total: f64 = candidates.iter().map(|c| c.score).sum();
            let better = match &best {
                Some((best_total, _, _)) => total > *best_total,
                None => true,
            };
            if better {
                best = Some((total, candidates, kind));
            }
        }

        match best {
            Some((_, candidates, kind)) => Extraction {
                candidates,
                strategy_used: Some(kind),
                attempted,
            },
            None => Extraction {
                candidates: Vec::new(),
                strategy_used: None,
                attempted,
            },
        }
    }
}

impl std::fmt::Debug for ContentExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentExtractor")
            .field("strategies", &self.strategy_kinds())
            .field("min_viable", &self.min_viable)
            .field("candidate_limit", &self.candidate_limit)
            .finish()
    }
}
