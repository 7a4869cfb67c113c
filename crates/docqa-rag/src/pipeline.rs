//! Hybrid retrieval pipeline: expand, retrieve, filter, rerank, truncate

use std::sync::Arc;

use docqa_core::{Passage, Result, RetrievalConfig, SimilaritySearchClient, TextGenerationClient};

use crate::expander::{ExpansionOutcome, QueryExpander};
use crate::filter::{FilterOutcome, MetadataFilter};
use crate::reranker::{RankingOutcome, Reranker};
use crate::retriever::CandidateRetriever;

/// Everything one `search` call did, for diagnostics and tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalReport {
    pub expanded_query: String,
    pub expansion: ExpansionOutcome,
    pub threshold_fallback: bool,
    pub candidate_count: usize,
    pub filter: FilterOutcome,
    pub filtered_count: usize,
    pub ranking: RankingOutcome,
    /// Final passages, at most `final_top_k`, in reranked order.
    pub passages: Vec<Passage>,
}

impl RetrievalReport {
    /// True when any soft stage fell back to its input.
    pub fn degraded(&self) -> bool {
        !matches!(self.expansion, ExpansionOutcome::Expanded)
            || matches!(self.filter, FilterOutcome::FellBack { .. })
            || matches!(self.ranking, RankingOutcome::Fallback(_))
    }
}

/// Composes the four retrieval stages.
///
/// Stateless between calls: collaborators are shared through `Arc` and the
/// configuration is read-only, so one pipeline may serve concurrent requests.
pub struct HybridRetrievalPipeline<S, G>
where
    S: SimilaritySearchClient + ?Sized,
    G: TextGenerationClient + ?Sized,
{
    expander: QueryExpander<G>,
    retriever: CandidateRetriever<S>,
    filter: MetadataFilter,
    reranker: Reranker<G>,
    config: RetrievalConfig,
}

impl<S, G> HybridRetrievalPipeline<S, G>
where
    S: SimilaritySearchClient + ?Sized,
    G: TextGenerationClient + ?Sized,
{
    /// Build the pipeline; fails on an invalid configuration.
    pub fn new(search: Arc<S>, generator: Arc<G>, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            expander: QueryExpander::new(generator.clone(), &config),
            retriever: CandidateRetriever::new(search, &config),
            filter: MetadataFilter::new(&config),
            reranker: Reranker::new(generator, &config),
            config,
        })
    }

    /// Ranked passages for `query`, at most `final_top_k` of them.
    pub async fn search(&self, query: &str) -> Result<Vec<Passage>> {
        Ok(self.search_with_report(query).await?.passages)
    }

    /// Only a similarity search failure is returned as an error.
    pub async fn search_with_report(&self, query: &str) -> Result<RetrievalReport> {
        let expansion = self.expander.expand_with_outcome(query).await;
        let candidates = self.retriever.retrieve_with_outcome(&expansion.query).await?;
        let candidate_count = candidates.passages.len();

        let (filtered, filter) = self.filter.filter_with_outcome(candidates.passages, query);
        let filtered_count = filtered.len();

        let (mut passages, ranking) = self.reranker.rerank_with_outcome(query, filtered).await;
        passages.truncate(self.config.final_top_k);

        tracing::debug!(
            "Retrieval: {} candidates, {} after filter, {} returned",
            candidate_count,
            filtered_count,
            passages.len()
        );

        Ok(RetrievalReport {
            expanded_query: expansion.query,
            expansion: expansion.outcome,
            threshold_fallback: candidates.used_fallback,
            candidate_count,
            filter,
            filtered_count,
            ranking,
            passages,
        })
    }
}
