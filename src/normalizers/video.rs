use url::Url;

use crate::errors::{FeedgenError, FeedgenResult};
use crate::normalizers::rule::{resolve_against_root, NormalizationRule};

const VIDEO_HOSTS: &[&str] = &["www.youtube.com", "youtube.com", "m.youtube.com"];
const CANONICAL_HOST: &str = "www.youtube.com";

pub const VIDEO_RULE_ID: &str = "video-site";

/// Watch, shorts and channel links on the video site are root-relative.
/// Relative and absolute links alike end up on the `www` host.
pub fn rule() -> NormalizationRule {
    NormalizationRule::new(
        VIDEO_RULE_ID,
        |host, _path| VIDEO_HOSTS.contains(&host),
        canonicalize,
    )
}

fn canonicalize(raw: &str, _base: &Url) -> FeedgenResult<Url> {
    let root = Url::parse("https://www.youtube.com/")
        .map_err(|e| FeedgenError::normalization(raw, e.to_string()))?;
    let mut resolved = resolve_against_root(raw, &root)?;

    if resolved.host_str().is_some_and(|host| VIDEO_HOSTS.contains(&host)) {
        resolved
            .set_host(Some(CANONICAL_HOST))
            .map_err(|e| FeedgenError::normalization(raw, e.to_string()))?;
    }
    Ok(resolved)
}
