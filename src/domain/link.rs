use serde::{Deserialize, Serialize};

/// Result of running a raw link through the normalizer registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedLink {
    pub original: String,
    pub resolved: String,
    pub rule_applied: String,
}

impl NormalizedLink {
    pub fn new(original: &str, resolved: String, rule_applied: &str) -> Self {
        Self {
            original: original.to_string(),
            resolved,
            rule_applied: rule_applied.to_string(),
        }
    }
}
