use url::Url;

use crate::domain::NormalizedLink;
use crate::errors::{FeedgenError, FeedgenResult};
use crate::normalizers::rule::NormalizationRule;
use crate::normalizers::{aggregator, video};

/// Ordered link-normalization rules. The first rule whose predicate matches wins;
/// generic relative-to-absolute resolution is always last and always matches.
pub struct NormalizerRegistry {
    rules: Vec<NormalizationRule>,
    fallback: NormalizationRule,
}

impl NormalizerRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Site-specific rules first; order is part of the contract
        registry.register(aggregator::rule());
        registry.register(video::rule());

        registry
    }

    /// Registry holding only the generic fallback.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            fallback: NormalizationRule::generic(),
        }
    }

    /// Append a rule. It is consulted after every rule registered before it
    /// and always before the generic fallback.
    pub fn register(&mut self, rule: NormalizationRule) {
        self.rules.push(rule);
    }

    /// Swap out the rule with the same id in place, keeping its position.
    /// Appends when no such rule exists.
    pub fn replace(&mut self, rule: NormalizationRule) {
        match self.rules.iter().position(|r| r.id() == rule.id()) {
            Some(index) => self.rules[index] = rule,
            None => self.register(rule),
        }
    }

    /// Rule ids in evaluation order, fallback included.
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|r| r.id())
            .collect()
    }

    /// Find the rule that handles a link pointing at `host` + `path`
    pub fn find_rule(&self, host: &str, path: &str) -> &NormalizationRule {
        self.rules
            .iter()
            .find(|r| r.matches(host, path))
            .unwrap_or(&self.fallback)
    }

    /// Resolve `raw` found on the page at `base` into a canonical absolute URL.
    pub fn normalize(&self, raw: &str, base: &str) -> FeedgenResult<String> {
        let base = Url::parse(base).map_err(|e| FeedgenError::InvalidUrl(e.to_string()))?;
        Ok(self.normalize_link(raw, &base)?.resolved)
    }

    pub fn normalize_link(&self, raw: &str, base: &Url) -> FeedgenResult<NormalizedLink> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FeedgenError::normalization(raw, "empty link"));
        }

        // Absolute links are judged by their own host, relative ones by the page's
        let target = match Url::parse(trimmed) {
            Ok(absolute) => {
                if !matches!(absolute.scheme(), "http" | "https") {
                    return Err(FeedgenError::normalization(
                        raw,
                        format!("unsupported scheme '{}'", absolute.scheme()),
                    ));
                }
                absolute
            }
            Err(_) => base.clone(),
        };

        let host = target.host_str().unwrap_or_default();
        let rule = self.find_rule(host, target.path());
        let resolved = rule.apply(trimmed, base)?;

        Ok(NormalizedLink::new(raw, resolved.to_string(), rule.id()))
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerRegistry")
            .field("rules", &self.rule_ids())
            .finish()
    }
}
