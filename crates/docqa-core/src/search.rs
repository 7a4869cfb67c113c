//! Similarity search and embedding capability traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Passage, Result};

/// A single similarity search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    /// Minimum similarity a passage must reach. `None` accepts everything.
    pub similarity_threshold: Option<f32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            similarity_threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }
}

/// Trait for embedding-backed similarity search services
///
/// Implementations return at most `top_k` passages ordered by descending
/// similarity, each carrying its `similarity_score`. Calls must be
/// idempotent and free of side effects. An `Err` means the backend could not
/// be reached; "nothing matched" is an empty `Ok`.
#[async_trait]
pub trait SimilaritySearchClient: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Passage>>;
}

/// Trait for text embedding models
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| crate::Error::Embedding("No embedding returned".to_string()))
    }
}
