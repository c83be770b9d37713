use std::collections::HashSet;

use crate::domain::{Candidate, FeedItem};

/// Drop candidates whose normalized title was already seen, keeping the first.
/// Candidates with a blank title are dropped too.
pub fn dedupe(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|candidate| {
            let key = candidate.dedup_key();
            !key.is_empty() && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Deduplicate, then cap at `max_items`.
pub fn assemble(candidates: &[Candidate], max_items: usize) -> Vec<FeedItem> {
    dedupe(candidates)
        .iter()
        .take(max_items)
        .map(FeedItem::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategyKind;

    fn candidate(title: &str, link: &str) -> Candidate {
        Candidate::new(title.to_string(), link.to_string(), StrategyKind::HeadingLink)
    }

    #[test]
    fn test_case_and_whitespace_duplicates_collapse() {
        let candidates = vec![
            candidate("Breaking News", "https://example.com/1"),
            candidate("breaking   news", "https://example.com/2"),
        ];

        let unique = dedupe(&candidates);

        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].link, "https://example.com/1");
    }

    #[test]
    fn test_dedupe_is_idempotent_and_stable() {
        let candidates = vec![
            candidate("B", "https://example.com/b"),
            candidate("A", "https://example.com/a"),
            candidate("b", "https://example.com/b2"),
            candidate("C", "https://example.com/c"),
        ];

        let once = dedupe(&candidates);
        let twice = dedupe(&once);

        assert_eq!(once, twice);
        let titles: Vec<_> = once.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_blank_titles_dropped() {
        let candidates = vec![candidate("  ", "https://example.com/x")];
        assert!(dedupe(&candidates).is_empty());
    }

    #[test]
    fn test_truncation_happens_after_dedup() {
        let candidates = vec![
            candidate("One", "https://example.com/1"),
            candidate("one", "https://example.com/1b"),
            candidate("Two", "https://example.com/2"),
            candidate("Three", "https://example.com/3"),
        ];

        let items = assemble(&candidates, 2);

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let candidates = vec![
            candidate("Same", "https://example.com/1"),
            candidate("Same", "https://example.com/2"),
        ];
        let before = candidates.clone();

        assemble(&candidates, 20);

        assert_eq!(candidates, before);
    }

    #[test]
    fn test_never_exceeds_max_items() {
        let candidates: Vec<_> = (0..50)
            .map(|i| candidate(&format!("Item {}", i), &format!("https://example.com/{}", i)))
            .collect();

        assert_eq!(assemble(&candidates, 20).len(), 20);
        assert!(assemble(&candidates, 0).is_empty());
    }
}
