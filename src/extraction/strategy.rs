use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::{Candidate, StrategyKind};
use crate::normalizers::NormalizerRegistry;

pub(crate) static HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid heading selector"));
pub(crate) static LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// What a strategy needs to know about the page besides its tree.
pub struct PageContext<'a> {
    pub base: &'a Url,
    pub registry: &'a NormalizerRegistry,
    /// Upper bound on candidates one strategy may return.
    pub limit: usize,
}

impl<'a> PageContext<'a> {
    pub fn new(base: &'a Url, registry: &'a NormalizerRegistry, limit: usize) -> Self {
        Self {
            base,
            registry,
            limit,
        }
    }

    /// Normalize a raw link, dropping it when it cannot be made absolute.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        match self.registry.normalize_link(raw, self.base) {
            Ok(link) => Some(link.resolved),
            Err(e) => {
                debug!("Skipping candidate link: {}", e);
                None
            }
        }
    }
}

pub trait ExtractionStrategy: Send + Sync {
    /// Identifies this strategy
    fn kind(&self) -> StrategyKind;

    /// Scan the document for candidates. Fragments that do not yield a
    /// title and a link are skipped.
    fn extract(&self, document: &Html, page: &PageContext<'_>) -> Vec<Candidate>;
}
