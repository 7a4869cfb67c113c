//! Hybrid retrieval-and-reranking engine for DocQA
//!
//! A question flows through four stages before it reaches the answer model:
//!
//! ```text
//! question ─► QueryExpander ─► CandidateRetriever ─► MetadataFilter ─► Reranker ─► top N
//!              (LLM, soft)      (threshold, then       (code-query      (LLM, soft)
//!                                none on empty)         heuristic)
//! ```
//!
//! Stages marked "soft" never fail the request: when the model is down,
//! slow, or answers with something unusable, the stage hands its input
//! through unchanged and records why in the [`RetrievalReport`]. Only an
//! unreachable similarity search backend, or a failed final answer call, is
//! surfaced to the caller.

mod answer;
mod context;
mod enrich;
mod expander;
mod filter;
mod pipeline;
mod reranker;
mod retriever;
mod rewriter;
mod store;

#[cfg(test)]
mod testing;

pub use answer::{Answer, AnswerGenerator};
pub use context::{format_context, tidy_content};
pub use enrich::{complexity_score, enrich_metadata, technical_terms};
pub use expander::{Expansion, ExpansionOutcome, QueryExpander};
pub use filter::{FilterOutcome, MetadataFilter};
pub use pipeline::{HybridRetrievalPipeline, RetrievalReport};
pub use reranker::{parse_ranking, RankingOutcome, Reranker};
pub use retriever::{CandidateRetriever, Candidates};
pub use rewriter::QueryRewriter;
pub use store::InMemoryPassageStore;

// Re-export core types for convenience
pub use docqa_core::{
    AnswerConfig, EmptyFilterPolicy, Error, GenerationRequest, Passage, Result, RetrievalConfig,
    SearchRequest, SimilaritySearchClient, TextGenerationClient,
};
