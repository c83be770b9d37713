use url::Url;

use crate::errors::{FeedgenError, FeedgenResult};

type Predicate = Box<dyn Fn(&str, &str) -> bool + Send + Sync>;
type Transform = Box<dyn Fn(&str, &Url) -> FeedgenResult<Url> + Send + Sync>;

/// A (predicate, transform) pair rewriting raw links for one family of sites.
///
/// The predicate sees the host and path the link points at (the page's own
/// host and path when the link is relative). The transform receives the
/// trimmed raw link and the page URL and must return an absolute URL.
pub struct NormalizationRule {
    id: String,
    predicate: Predicate,
    transform: Transform,
}

impl NormalizationRule {
    pub fn new<P, T>(id: impl Into<String>, predicate: P, transform: T) -> Self
    where
        P: Fn(&str, &str) -> bool + Send + Sync + 'static,
        T: Fn(&str, &Url) -> FeedgenResult<Url> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            predicate: Box::new(predicate),
            transform: Box::new(transform),
        }
    }

    /// Rule for a single host whose relative links resolve against `root`.
    pub fn for_host_root(
        id: impl Into<String>,
        hosts: &'static [&'static str],
        root: &'static str,
    ) -> Self {
        Self::new(
            id,
            move |host, _path| hosts.contains(&host),
            move |raw, _base| {
                let root = Url::parse(root)
                    .map_err(|e| FeedgenError::normalization(raw, e.to_string()))?;
                resolve_against_root(raw, &root)
            },
        )
    }

    /// Standard RFC 3986 resolution against the page URL. Always matches.
    pub fn generic() -> Self {
        Self::new(GENERIC_RULE_ID, |_, _| true, resolve_generic)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn matches(&self, host: &str, path: &str) -> bool {
        (self.predicate)(host, path)
    }

    pub fn apply(&self, raw: &str, base: &Url) -> FeedgenResult<Url> {
        (self.transform)(raw, base)
    }
}

impl std::fmt::Debug for NormalizationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizationRule")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

pub const GENERIC_RULE_ID: &str = "generic";

pub fn resolve_generic(raw: &str, base: &Url) -> FeedgenResult<Url> {
    let resolved = base
        .join(raw)
        .map_err(|e| FeedgenError::normalization(raw, e.to_string()))?;
    ensure_web_scheme(raw, resolved)
}

/// Resolve a link against a fixed site root, ignoring where on the site the page lives.
/// Absolute links are returned unchanged.
pub fn resolve_against_root(raw: &str, root: &Url) -> FeedgenResult<Url> {
    if let Ok(absolute) = Url::parse(raw) {
        return ensure_web_scheme(raw, absolute);
    }

    let relative = raw.strip_prefix("./").unwrap_or(raw);
    let relative = if relative.starts_with("//") {
        relative
    } else {
        relative.trim_start_matches('/')
    };

    let resolved = root
        .join(relative)
        .map_err(|e| FeedgenError::normalization(raw, e.to_string()))?;
    ensure_web_scheme(raw, resolved)
}

fn ensure_web_scheme(raw: &str, url: Url) -> FeedgenResult<Url> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FeedgenError::normalization(
            raw,
            format!("unsupported scheme '{}'", other),
        )),
    }
}
