use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{Candidate, StrategyKind};
use crate::extraction::strategy::{ExtractionStrategy, PageContext, HEADINGS, LINKS};
use crate::extraction::text::{
    element_text, first_line_within, published_time, raw_text, truncate_chars,
    truncate_description,
};

/// Class patterns used by utility-CSS card grids, tried in this order.
const CARD_SELECTORS: &[&str] = &[
    r#"[class*="content"]"#,
    r#"[class*="card"]"#,
    r#"[class*="cursor-pointer"]"#,
    "article",
    r#"[class*="item"]"#,
];

/// Attributes that make a whole card clickable without an anchor.
const LINK_ATTRIBUTES: &[&str] = &["data-href", "data-url", "data-link"];

const MIN_CARD_TEXT: usize = 10;

static CARDS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CARD_SELECTORS
        .iter()
        .map(|css| Selector::parse(css).expect("valid card selector"))
        .collect()
});

#[derive(Debug, Default)]
pub struct CardElementStrategy;

impl CardElementStrategy {
    pub fn new() -> Self {
        Self
    }

    fn candidate(&self, card: ElementRef<'_>, page: &PageContext<'_>) -> Option<Candidate> {
        let text = element_text(card);
        if text.chars().count() < MIN_CARD_TEXT {
            return None;
        }

        let (link, from_anchor) = card_link(card, page)?;

        let heading = card
            .select(&HEADINGS)
            .map(element_text)
            .find(|title| !title.is_empty());
        let has_heading = heading.is_some();
        let title = heading
            .or_else(|| first_line_within(&raw_text(card), 5, 200))
            .unwrap_or_else(|| truncate_chars(&text, 100));

        let published = published_time(card);

        let mut score = 3.0;
        if has_heading {
            score += 1.0;
        }
        if from_anchor {
            score += 1.0;
        }
        if published.is_some() {
            score += 0.5;
        }

        Some(
            Candidate::new(title, link, StrategyKind::CardElement)
                .with_score(score)
                .with_description(truncate_description(&text))
                .with_published(published),
        )
    }
}

impl ExtractionStrategy for CardElementStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CardElement
    }

    fn extract(&self, document: &Html, page: &PageContext<'_>) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for selector in CARDS.iter() {
            for card in document.select(selector) {
                if candidates.len() >= page.limit {
                    return candidates;
                }
                // An element matching several patterns is one card
                if !seen.insert(card.id()) {
                    continue;
                }
                if let Some(candidate) = self.candidate(card, page) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}

/// First anchor in the card, else a link-bearing data attribute on the card itself.
/// The flag says whether the link came from an anchor.
fn card_link(card: ElementRef<'_>, page: &PageContext<'_>) -> Option<(String, bool)> {
    if let Some(href) = card
        .select(&LINKS)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
    {
        return page.resolve(href).map(|link| (link, true));
    }

    LINK_ATTRIBUTES
        .iter()
        .find_map(|attr| card.value().attr(attr))
        .and_then(|raw| page.resolve(raw))
        .map(|link| (link, false))
}
