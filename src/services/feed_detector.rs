use feed_rs::model::FeedType;
use feed_rs::parser;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::{DetectedFeed, FeedKind};
use crate::services::fetch_service::Fetcher;

/// Paths sites commonly publish their feed at, tried in this order.
pub const COMMON_FEED_PATHS: &[&str] = &[
    "/feed",
    "/rss",
    "/atom.xml",
    "/rss.xml",
    "/feed.xml",
    "/feeds/all.atom.xml",
    "/rss/index.xml",
    "/feed/index.xml",
];

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/feed+json, application/xml;q=0.9, */*;q=0.5";

static ALTERNATE_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"link[rel~="alternate"][href]"#).expect("valid alternate link selector")
});

/// Feeds a page advertises with `<link rel="alternate">`, in document order.
pub fn detect_feeds(document: &Html, base: &Url) -> Vec<DetectedFeed> {
    let mut feeds: Vec<DetectedFeed> = Vec::new();

    for link in document.select(&ALTERNATE_LINKS) {
        let element = link.value();
        let Some(kind) = element.attr("type").and_then(FeedKind::from_media_type) else {
            continue;
        };
        let Some(href) = element.attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            debug!(href, "Skipping unresolvable feed link");
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }

        let url = url.to_string();
        if feeds.iter().any(|feed| feed.url == url) {
            continue;
        }

        let title = element
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled feed")
            .to_string();

        feeds.push(DetectedFeed { url, title, kind });
    }

    feeds
}

/// First well-known feed path on the page's site that serves a parseable feed.
pub fn scan_common_paths<F: Fetcher>(fetcher: &F, page: &Url) -> Option<DetectedFeed> {
    let host = page.host_str()?;
    let headers = vec![("Accept".to_string(), FEED_ACCEPT.to_string())];

    COMMON_FEED_PATHS.iter().find_map(|path| {
        let mut candidate = page.clone();
        candidate.set_path(path);
        candidate.set_query(None);
        candidate.set_fragment(None);

        let fetched = match fetcher.fetch(candidate.as_str(), &headers) {
            Ok(fetched) => fetched,
            Err(e) => {
                debug!(url = %candidate, "No feed: {}", e);
                return None;
            }
        };

        let feed = match parser::parse(fetched.html.as_bytes()) {
            Ok(feed) => feed,
            Err(e) => {
                debug!(url = %candidate, "Not a feed document: {}", e);
                return None;
            }
        };

        let kind = match feed.feed_type {
            FeedType::Atom => FeedKind::Atom,
            FeedType::JSON => FeedKind::Json,
            _ => FeedKind::Rss,
        };
        let title = feed
            .title
            .map(|text| text.content.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| format!("{} - {}", host, kind.as_str().to_uppercase()));

        Some(DetectedFeed {
            url: candidate.to_string(),
            title,
            kind,
        })
    })
}
