use url::Url;

use crate::normalizers::rule::NormalizationRule;

/// The news aggregator whose listing pages use `./articles/<id>` style links
/// and whose article links wrap the real destination in an opaque id.
pub const AGGREGATOR_HOST: &str = "news.example-aggregator";
pub const AGGREGATOR_ROOT: &str = "https://news.example-aggregator/";
pub const AGGREGATOR_RULE_ID: &str = "news-aggregator";

/// `./articles/<id>`, `./read/<id>` and `/topics/<id>` resolve against the site
/// root rather than the listing page they appear on.
pub fn rule() -> NormalizationRule {
    NormalizationRule::for_host_root(AGGREGATOR_RULE_ID, &[AGGREGATOR_HOST], AGGREGATOR_ROOT)
}

/// Opaque article id of an aggregator link, if it is one.
pub fn obfuscated_id(url: &Url) -> Option<&str> {
    if url.host_str() != Some(AGGREGATOR_HOST) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let id = match segments.as_slice() {
        ["articles", id] | ["read", id] | ["rss", "articles", id] => *id,
        _ => return None,
    };

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

pub fn is_obfuscated(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| obfuscated_id(&parsed).is_some())
        .unwrap_or(false)
}
