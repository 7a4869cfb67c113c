//! Similarity search with a threshold-free fallback

use std::sync::Arc;

use docqa_core::{
    collapse_duplicates, Passage, Result, RetrievalConfig, SearchRequest, SimilaritySearchClient,
};

/// Candidate pool from one retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates {
    pub passages: Vec<Passage>,
    /// True when the thresholded search came back empty and the
    /// unthresholded retry produced `passages`.
    pub used_fallback: bool,
}

/// Runs the thresholded search first, then retries once without a threshold.
///
/// A fixed threshold under-retrieves on small or fine-tuned corpora, so
/// whenever the corpus has any content at all the pool is non-empty.
pub struct CandidateRetriever<S: SimilaritySearchClient + ?Sized> {
    search: Arc<S>,
    top_k: usize,
    threshold: f32,
}

impl<S: SimilaritySearchClient + ?Sized> CandidateRetriever<S> {
    pub fn new(search: Arc<S>, config: &RetrievalConfig) -> Self {
        Self {
            search,
            top_k: config.initial_top_k,
            threshold: config.similarity_threshold,
        }
    }

    pub async fn retrieve(&self, expanded_query: &str) -> Result<Vec<Passage>> {
        Ok(self.retrieve_with_outcome(expanded_query).await?.passages)
    }

    /// Search errors propagate; an empty result at both tiers is `Ok(empty)`.
    pub async fn retrieve_with_outcome(&self, expanded_query: &str) -> Result<Candidates> {
        let request = SearchRequest::new(expanded_query, self.top_k).with_threshold(self.threshold);
        let primary = self.bounded(self.search.search(&request).await?);

        if !primary.is_empty() {
            tracing::debug!("Similarity search returned {} candidates", primary.len());
            return Ok(Candidates {
                passages: primary,
                used_fallback: false,
            });
        }

        let relaxed = SearchRequest::new(expanded_query, self.top_k);
        let fallback = self.bounded(self.search.search(&relaxed).await?);
        tracing::info!(
            "No candidates at threshold {}; unthresholded retry returned {}",
            self.threshold,
            fallback.len()
        );

        Ok(Candidates {
            used_fallback: !fallback.is_empty(),
            passages: fallback,
        })
    }

    /// Collapse duplicates and cap at `top_k`, whatever the backend returned.
    fn bounded(&self, passages: Vec<Passage>) -> Vec<Passage> {
        let mut passages = collapse_duplicates(passages);
        passages.truncate(self.top_k);
        passages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contents, passages, ScriptedSearch};

    fn retriever(
        search: ScriptedSearch,
    ) -> (CandidateRetriever<ScriptedSearch>, Arc<ScriptedSearch>) {
        let search = Arc::new(search);
        (CandidateRetriever::new(search.clone(), &RetrievalConfig::default()), search)
    }

    #[tokio::test]
    async fn test_primary_hit_skips_fallback() {
        let (retriever, search) = retriever(ScriptedSearch::new(passages(2), passages(7)));
        let result = retriever.retrieve_with_outcome("q").await.unwrap();

        assert_eq!(result.passages.len(), 2);
        assert!(!result.used_fallback);
        let requests = search.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].top_k, 20);
        assert_eq!(requests[0].similarity_threshold, Some(0.65));
    }

    #[tokio::test]
    async fn test_empty_primary_retries_without_threshold() {
        let (retriever, search) = retriever(ScriptedSearch::new(vec![], passages(4)));
        let result = retriever.retrieve_with_outcome("q").await.unwrap();

        assert!(result.used_fallback);
        assert_eq!(contents(&result.passages), vec!["p0", "p1", "p2", "p3"]);
        let requests = search.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].top_k, 20);
        assert_eq!(requests[1].similarity_threshold, None);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_empty_not_error() {
        let (retriever, _) = retriever(ScriptedSearch::always(vec![]));
        let result = retriever.retrieve_with_outcome("q").await.unwrap();
        assert!(result.passages.is_empty());
        assert!(!result.used_fallback);
    }

    #[tokio::test]
    async fn test_unreachable_backend_propagates() {
        let (retriever, _) = retriever(ScriptedSearch::unreachable());
        assert!(retriever.retrieve("q").await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_backend_result_is_capped() {
        let (retriever, _) = retriever(ScriptedSearch::always(passages(35)));
        assert_eq!(retriever.retrieve("q").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_duplicates_collapse_in_order() {
        let pool = vec![Passage::new("a"), Passage::new("b"), Passage::new(" a ")];
        let (retriever, _) = retriever(ScriptedSearch::always(pool));
        assert_eq!(contents(&retriever.retrieve("q").await.unwrap()), vec!["a", "b"]);
    }
}
