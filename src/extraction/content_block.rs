use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{Candidate, StrategyKind};
use crate::extraction::strategy::{ExtractionStrategy, PageContext, LINKS};
use crate::extraction::text::{
    collapse_whitespace, element_text, published_time, raw_text, truncate_chars,
    truncate_description,
};

const MIN_BLOCK_TEXT: usize = 30;
const MAX_TITLE: usize = 100;

static BLOCKS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, div").expect("valid block selector"));

/// Last resort: any paragraph or div with enough text and an anchor inside.
#[derive(Debug, Default)]
pub struct ContentBlockStrategy;

impl ContentBlockStrategy {
    pub fn new() -> Self {
        Self
    }

    fn candidate(&self, block: ElementRef<'_>, page: &PageContext<'_>) -> Option<Candidate> {
        let text = element_text(block);
        let length = text.chars().count();
        if length < MIN_BLOCK_TEXT {
            return None;
        }

        let href = block
            .select(&LINKS)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))?;
        let link = page.resolve(href)?;

        let raw = raw_text(block);
        let first_line = raw
            .lines()
            .map(collapse_whitespace)
            .find(|line| !line.is_empty())
            .unwrap_or_else(|| text.clone());
        let title = truncate_chars(&first_line, MAX_TITLE);

        // Longer blocks are likelier to be real entries, up to a point
        let score = 1.0 + (length as f64 / 200.0).min(1.0);

        Some(
            Candidate::new(title, link, StrategyKind::ContentBlock)
                .with_score(score)
                .with_description(truncate_description(&text))
                .with_published(published_time(block)),
        )
    }
}

impl ExtractionStrategy for ContentBlockStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContentBlock
    }

    fn extract(&self, document: &Html, page: &PageContext<'_>) -> Vec<Candidate> {
        document
            .select(&BLOCKS)
            .filter_map(|block| self.candidate(block, page))
            .take(page.limit)
            .collect()
    }
}
