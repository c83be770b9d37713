use scraper::{ElementRef, Html};

use crate::domain::{Candidate, StrategyKind};
use crate::extraction::strategy::{ExtractionStrategy, PageContext, HEADINGS, LINKS};
use crate::extraction::text::{element_text, published_time, truncate_description};

/// Headings that contain, or sit inside, a link. Higher-level headings score more.
#[derive(Debug, Default)]
pub struct HeadingLinkStrategy;

impl HeadingLinkStrategy {
    pub fn new() -> Self {
        Self
    }

    fn candidate(&self, heading: ElementRef<'_>, page: &PageContext<'_>) -> Option<Candidate> {
        let anchor = heading
            .select(&LINKS)
            .next()
            .or_else(|| enclosing_link(heading))?;

        let href = anchor.value().attr("href")?;
        let link = page.resolve(href)?;

        let mut title = element_text(heading);
        if title.is_empty() {
            title = element_text(anchor);
        }
        if title.is_empty() {
            return None;
        }

        let description = description_for(heading);
        let published = heading
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(published_time);

        let mut score = level_weight(heading.value().name());
        if description.is_some() {
            score += 1.0;
        }

        Some(
            Candidate::new(title, link, StrategyKind::HeadingLink)
                .with_score(score)
                .with_description(description)
                .with_published(published),
        )
    }
}

impl ExtractionStrategy for HeadingLinkStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadingLink
    }

    fn extract(&self, document: &Html, page: &PageContext<'_>) -> Vec<Candidate> {
        document
            .select(&HEADINGS)
            .filter_map(|heading| self.candidate(heading, page))
            .take(page.limit)
            .collect()
    }
}

fn enclosing_link(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a" && ancestor.value().attr("href").is_some())
}

/// h1 weighs 6, h6 weighs 1.
fn level_weight(tag: &str) -> f64 {
    tag.strip_prefix('h')
        .and_then(|level| level.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
        .map(|level| f64::from(7 - level))
        .unwrap_or(1.0)
}

/// The next paragraph-like sibling, else whatever the parent says besides the heading.
fn description_for(heading: ElementRef<'_>) -> Option<String> {
    let sibling = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "p" | "div"))
        .find_map(|el| truncate_description(&element_text(el)));
    if sibling.is_some() {
        return sibling;
    }

    let parent = heading.parent().and_then(ElementRef::wrap)?;
    let parent_text = element_text(parent);
    let heading_text = element_text(heading);
    parent_text
        .strip_prefix(&heading_text)
        .and_then(truncate_description)
}
