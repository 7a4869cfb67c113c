//! Metadata-based candidate filtering

use docqa_core::{EmptyFilterPolicy, Passage, RetrievalConfig};

/// What the filter did to the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The query did not trigger any heuristic.
    NotApplied,
    /// Code query; `removed` passages flagged `has_code = false` were dropped.
    Narrowed { removed: usize },
    /// Filtering would have removed every candidate, so all were kept.
    FellBack { removed: usize },
    /// Filtering removed every candidate and the policy kept the empty set.
    Emptied,
}

/// Narrows candidates using the query wording and passage metadata.
///
/// Order-preserving and never introduces passages: the output is always a
/// subsequence of the input.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    code_keywords: Vec<String>,
    policy: EmptyFilterPolicy,
}

impl MetadataFilter {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            code_keywords: config
                .code_query_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            policy: config.empty_filter_policy,
        }
    }

    /// True when the lowercased query contains any code keyword.
    pub fn is_code_query(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        self.code_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub fn filter(&self, candidates: Vec<Passage>, original_query: &str) -> Vec<Passage> {
        self.filter_with_outcome(candidates, original_query).0
    }

    /// For code queries, drop passages whose `has_code` flag is false.
    /// Passages without the flag always pass.
    pub fn filter_with_outcome(
        &self,
        candidates: Vec<Passage>,
        original_query: &str,
    ) -> (Vec<Passage>, FilterOutcome) {
        if !self.is_code_query(original_query) {
            return (candidates, FilterOutcome::NotApplied);
        }

        let keep: Vec<bool> = candidates
            .iter()
            .map(|p| p.has_code() != Some(false))
            .collect();
        let kept = keep.iter().filter(|k| **k).count();
        let removed = candidates.len() - kept;

        if kept == 0 && !candidates.is_empty() {
            return match self.policy {
                EmptyFilterPolicy::FallBackToUnfiltered => {
                    tracing::warn!(
                        "Code filter would drop all {} candidates; keeping them unfiltered",
                        removed
                    );
                    (candidates, FilterOutcome::FellBack { removed })
                }
                EmptyFilterPolicy::KeepEmpty => (Vec::new(), FilterOutcome::Emptied),
            };
        }

        let narrowed = candidates
            .into_iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(p))
            .collect();
        (narrowed, FilterOutcome::Narrowed { removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::contents;

    fn flagged(name: &str, has_code: Option<bool>) -> Passage {
        let p = Passage::new(name);
        match has_code {
            Some(flag) => p.with_metadata(Passage::HAS_CODE, flag),
            None => p,
        }
    }

    fn filter() -> MetadataFilter {
        MetadataFilter::new(&RetrievalConfig::default())
    }

    #[test]
    fn test_non_code_query_passes_everything() {
        let pool = vec![flagged("a", Some(false)), flagged("b", Some(true))];
        let (out, outcome) = filter().filter_with_outcome(pool, "what is a vector store");
        assert_eq!(contents(&out), vec!["a", "b"]);
        assert_eq!(outcome, FilterOutcome::NotApplied);
    }

    #[test]
    fn test_code_query_keeps_code_and_unflagged_in_order() {
        let pool = vec![
            flagged("prose", Some(false)),
            flagged("snippet", Some(true)),
            flagged("unknown", None),
            flagged("more-prose", Some(false)),
            flagged("snippet-2", Some(true)),
        ];
        let (out, outcome) = filter().filter_with_outcome(pool, "Show me a CODE sample");
        assert_eq!(contents(&out), vec!["snippet", "unknown", "snippet-2"]);
        assert_eq!(outcome, FilterOutcome::Narrowed { removed: 2 });
    }

    #[test]
    fn test_example_keyword_triggers_filter() {
        assert!(filter().is_code_query("an Example of retries"));
        assert!(!filter().is_code_query("explain retries"));
    }

    #[test]
    fn test_all_prose_falls_back_to_unfiltered() {
        let pool = vec![flagged("a", Some(false)), flagged("b", Some(false))];
        let (out, outcome) = filter().filter_with_outcome(pool, "code for retries");
        assert_eq!(contents(&out), vec!["a", "b"]);
        assert_eq!(outcome, FilterOutcome::FellBack { removed: 2 });
    }

    #[test]
    fn test_keep_empty_policy() {
        let config = RetrievalConfig {
            empty_filter_policy: EmptyFilterPolicy::KeepEmpty,
            ..Default::default()
        };
        let pool = vec![flagged("a", Some(false))];
        let (out, outcome) = MetadataFilter::new(&config).filter_with_outcome(pool, "code please");
        assert!(out.is_empty());
        assert_eq!(outcome, FilterOutcome::Emptied);
    }

    #[test]
    fn test_empty_pool_stays_empty() {
        let (out, outcome) = filter().filter_with_outcome(vec![], "code please");
        assert!(out.is_empty());
        assert_eq!(outcome, FilterOutcome::Narrowed { removed: 0 });
    }
}
