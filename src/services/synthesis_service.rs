use chrono::Utc;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SynthesisOptions;
use crate::decoder::UrlDecoder;
use crate::domain::{
    DecodeOutcome, DetectedFeed, FeedItem, NormalizedLink, SynthesizedFeed, UnchangedReason,
};
use crate::errors::{FeedgenError, FeedgenResult};
use crate::extraction::{extract_metadata, parse_document, ContentExtractor};
use crate::normalizers::aggregator::is_obfuscated;
use crate::normalizers::NormalizerRegistry;
use crate::services::assembler::assemble;
use crate::services::feed_detector::{detect_feeds, scan_common_paths};
use crate::services::fetch_service::{Fetcher, HttpFetcher};

/// Drives one page through extraction, deduplication, capping and decoding.
pub struct SynthesisService<F: Fetcher> {
    fetcher: F,
    registry: NormalizerRegistry,
    extractor: ContentExtractor,
    decoder: Option<UrlDecoder>,
    options: SynthesisOptions,
}

impl SynthesisService<HttpFetcher> {
    /// Service with the HTTP fetcher and, when enabled, the HTTP decoder and configured cache.
    pub fn from_options(options: SynthesisOptions) -> FeedgenResult<Self> {
        let fetcher = HttpFetcher::new(&options.user_agent, options.fetch_timeout)?;
        let decoder = UrlDecoder::from_options(&options);
        Ok(Self::new(fetcher, options).with_decoder(decoder))
    }
}

impl<F: Fetcher> SynthesisService<F> {
    /// Service without a decoder; attach one with `with_decoder`.
    pub fn new(fetcher: F, options: SynthesisOptions) -> Self {
        Self {
            fetcher,
            registry: NormalizerRegistry::new(),
            extractor: ContentExtractor::from_options(&options),
            decoder: None,
            options,
        }
    }

    pub fn with_registry(mut self, registry: NormalizerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_decoder(mut self, decoder: Option<UrlDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    pub fn registry(&self) -> &NormalizerRegistry {
        &self.registry
    }

    /// For registering site rules at runtime.
    pub fn registry_mut(&mut self) -> &mut NormalizerRegistry {
        &mut self.registry
    }

    pub fn decoder(&self) -> Option<&UrlDecoder> {
        self.decoder.as_ref()
    }

    /// Items for an already parsed page. Obfuscated links of kept items are
    /// decoded when a decoder is attached; the rest are never decoded.
    pub fn synthesize_feed(&self, document: &Html, base: &Url) -> Vec<FeedItem> {
        let extraction = self.extractor.extract(document, base, &self.registry);
        let mut items = assemble(&extraction.candidates, self.options.max_items);

        debug!(
            strategy = ?extraction.strategy_used,
            candidates = extraction.candidates.len(),
            items = items.len(),
            "Synthesized items"
        );

        if let Some(decoder) = &self.decoder {
            for item in items.iter_mut().filter(|item| is_obfuscated(&item.link)) {
                item.link = decoder.decode(&item.link).into_url();
            }
        }

        items
    }

    /// Fetch `url`, then build the whole feed from it.
    pub fn generate(&self, url: &str) -> FeedgenResult<SynthesizedFeed> {
        let requested = parse_web_url(url)?;

        let headers = vec![(
            "Accept".to_string(),
            "text/html,application/xhtml+xml".to_string(),
        )];
        let page = self.fetcher.fetch(requested.as_str(), &headers)?;

        // Relative links resolve against where the page was actually served from
        let base = Url::parse(&page.final_url).unwrap_or_else(|_| requested.clone());
        let document = parse_document(&page.html)?;

        let metadata = extract_metadata(&document);
        let items = self.synthesize_feed(&document, &base);

        info!(url = %requested, items = items.len(), "Generated feed");

        Ok(SynthesizedFeed {
            title: metadata.title,
            description: metadata.description,
            link: requested.to_string(),
            items,
            generated_at: Utc::now(),
        })
    }

    /// Native feeds for `url`: those the page advertises, else the first
    /// well-known feed path that serves one. An unreachable page is not an error.
    pub fn detect_feeds(&self, url: &str) -> FeedgenResult<Vec<DetectedFeed>> {
        let requested = parse_web_url(url)?;

        let headers = vec![(
            "Accept".to_string(),
            "text/html,application/xhtml+xml".to_string(),
        )];
        let advertised = match self.fetcher.fetch(requested.as_str(), &headers) {
            Ok(page) => {
                let base = Url::parse(&page.final_url).unwrap_or_else(|_| requested.clone());
                match parse_document(&page.html) {
                    Ok(document) => detect_feeds(&document, &base),
                    Err(e) => {
                        debug!(url = %requested, "No page to read feed links from: {}", e);
                        Vec::new()
                    }
                }
            }
            Err(e) => {
                warn!(url = %requested, "Page unavailable, scanning common feed paths: {}", e);
                Vec::new()
            }
        };

        if !advertised.is_empty() {
            info!(url = %requested, feeds = advertised.len(), "Page advertises feeds");
            return Ok(advertised);
        }

        let found: Vec<DetectedFeed> = scan_common_paths(&self.fetcher, &requested)
            .into_iter()
            .collect();
        info!(url = %requested, feeds = found.len(), "Scanned common feed paths");
        Ok(found)
    }

    pub fn normalize(&self, link: &str, base: &str) -> FeedgenResult<NormalizedLink> {
        let base = parse_web_url(base)?;
        self.registry.normalize_link(link, &base)
    }

    /// Decoding through the attached decoder; without one the URL comes back unchanged.
    pub fn decode(&self, url: &str) -> DecodeOutcome {
        match &self.decoder {
            Some(decoder) => decoder.decode(url),
            None => DecodeOutcome::unchanged(url, UnchangedReason::Disabled),
        }
    }
}

/// Items for a parsed page with the built-in rules and the options' decoder settings.
pub fn synthesize_feed(document: &Html, base: &Url, options: &SynthesisOptions) -> Vec<FeedItem> {
    let registry = NormalizerRegistry::new();
    let extractor = ContentExtractor::from_options(options);
    let extraction = extractor.extract(document, base, &registry);
    let items = assemble(&extraction.candidates, options.max_items);

    match UrlDecoder::from_options(options) {
        Some(decoder) => items
            .into_iter()
            .map(|mut item| {
                if is_obfuscated(&item.link) {
                    item.link = decoder.decode(&item.link).into_url();
                }
                item
            })
            .collect(),
        None => items,
    }
}

fn parse_web_url(raw: &str) -> FeedgenResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| FeedgenError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FeedgenError::InvalidUrl(format!(
            "{}: only http and https pages are supported",
            raw
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderOptions;
    use crate::decoder::upstream::MockDecodeUpstream;
    use crate::services::fetch_service::{FetchedPage, MockFetcher};
    use std::sync::Arc;
    use std::time::Duration;

    const PAGE: &str = r#"<html><head><title>Aggregator Topic</title></head><body>
        <h3><a href="./articles/AAA">First headline</a></h3>
        <h3><a href="./read/BBB">Second headline</a></h3>
        <h3><a href="./articles/CCC">first   HEADLINE</a></h3>
        <h3><a href="/topics/DDD">Topic page</a></h3>
        </body></html>"#;

    fn options(max_items: usize) -> SynthesisOptions {
        SynthesisOptions {
            max_items,
            ..SynthesisOptions::default()
        }
    }

    fn serving(html: &'static str, final_url: &'static str) -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(1).returning(move |_, _| {
            Ok(FetchedPage {
                html: html.to_string(),
                final_url: final_url.to_string(),
            })
        });
        fetcher
    }

    #[test]
    fn test_generate_builds_feed() {
        let fetcher = serving(PAGE, "https://news.example-aggregator/topics/T1?hl=en");
        let service = SynthesisService::new(fetcher, options(20));

        let feed = service
            .generate("https://news.example-aggregator/topics/T1?hl=en")
            .unwrap();

        assert_eq!(feed.title, "Aggregator Topic");
        let links: Vec<_> = feed.items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://news.example-aggregator/articles/AAA",
                "https://news.example-aggregator/read/BBB",
                "https://news.example-aggregator/topics/DDD",
            ]
        );
    }

    #[test]
    fn test_generate_rejects_bad_url_without_fetching() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let service = SynthesisService::new(fetcher, options(20));

        assert!(matches!(service.generate("not a url"), Err(FeedgenError::InvalidUrl(_))));
        assert!(matches!(
            service.generate("ftp://example.com/"),
            Err(FeedgenError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_fetch_error_propagates() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|url, _| Err(FeedgenError::Fetch(format!("{} returned HTTP 503", url))));
        let service = SynthesisService::new(fetcher, options(20));

        assert!(matches!(
            service.generate("https://example.com/"),
            Err(FeedgenError::Fetch(_))
        ));
    }

    #[test]
    fn test_empty_page_is_parse_error() {
        let fetcher = serving("   ", "https://example.com/");
        let service = SynthesisService::new(fetcher, options(20));

        assert!(matches!(
            service.generate("https://example.com/"),
            Err(FeedgenError::Parse(_))
        ));
    }

    #[test]
    fn test_relative_links_follow_redirect_target() {
        let html = r#"<html><body>
            <h2><a href="post-1">One</a></h2><h2><a href="post-2">Two</a></h2><h2><a href="post-3">Three</a></h2>
            </body></html>"#;
        let fetcher = serving(html, "https://example.com/blog/");
        let service = SynthesisService::new(fetcher, options(20));

        let feed = service.generate("https://example.com/old-blog").unwrap();

        assert_eq!(feed.link, "https://example.com/old-blog");
        assert_eq!(feed.items[0].link, "https://example.com/blog/post-1");
    }

    #[test]
    fn test_only_kept_items_are_decoded() {
        let mut upstream = MockDecodeUpstream::new();
        upstream
            .expect_decode_once()
            .withf(|url, _| url == "https://news.example-aggregator/articles/AAA")
            .times(1)
            .returning(|_, _| Ok("https://publisher.example.com/aaa".to_string()));

        let decoder = UrlDecoder::new(DecoderOptions {
            decode_enabled: true,
            request_interval: Duration::ZERO,
            ..DecoderOptions::default()
        })
        .with_upstream(Arc::new(upstream));

        let service = SynthesisService::new(MockFetcher::new(), options(1)).with_decoder(Some(decoder));
        let document = parse_document(PAGE).unwrap();
        let base = Url::parse("https://news.example-aggregator/topics/T1").unwrap();

        let items = service.synthesize_feed(&document, &base);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://publisher.example.com/aaa");
    }

    #[test]
    fn test_detect_prefers_advertised_feeds() {
        let html = r#"<html><head><link rel="alternate" type="application/rss+xml" title="All posts" href="/index.xml"></head><body></body></html>"#;
        let fetcher = serving(html, "https://example.com/blog/");
        let service = SynthesisService::new(fetcher, options(20));

        let feeds = service.detect_feeds("https://example.com/blog").unwrap();

        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/index.xml");
        assert_eq!(feeds[0].title, "All posts");
    }

    #[test]
    fn test_detect_falls_back_to_common_paths() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url, _| url == "https://example.com/news")
            .times(1)
            .returning(|url, _| Err(FeedgenError::Fetch(format!("{} returned HTTP 500", url))));
        fetcher
            .expect_fetch()
            .withf(|url, _| url == "https://example.com/feed")
            .times(1)
            .returning(|url, _| {
                Ok(FetchedPage {
                    html: r#"<rss version="2.0"><channel><title>News</title></channel></rss>"#.to_string(),
                    final_url: url.to_string(),
                })
            });
        let service = SynthesisService::new(fetcher, options(20));

        let feeds = service.detect_feeds("https://example.com/news").unwrap();

        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/feed");
        assert_eq!(feeds[0].kind, crate::domain::FeedKind::Rss);
    }

    #[test]
    fn test_detect_rejects_bad_url() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let service = SynthesisService::new(fetcher, options(20));

        assert!(matches!(
            service.detect_feeds("mailto:someone@example.com"),
            Err(FeedgenError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_decode_without_decoder_is_disabled() {
        let service = SynthesisService::new(MockFetcher::new(), options(20));
        assert_eq!(
            service.decode("https://news.example-aggregator/articles/AAA"),
            DecodeOutcome::unchanged(
                "https://news.example-aggregator/articles/AAA",
                UnchangedReason::Disabled
            )
        );
    }

    #[test]
    fn test_normalize_passthrough() {
        let service = SynthesisService::new(MockFetcher::new(), options(20));
        let link = service
            .normalize("./articles/X", "https://news.example-aggregator/")
            .unwrap();
        assert_eq!(link.resolved, "https://news.example-aggregator/articles/X");
    }

    #[test]
    fn test_free_function_matches_service() {
        let document = parse_document(PAGE).unwrap();
        let base = Url::parse("https://news.example-aggregator/topics/T1").unwrap();

        let items = synthesize_feed(&document, &base, &options(2));

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title, "Second headline");
    }
}
