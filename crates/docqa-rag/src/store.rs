//! In-memory similarity search store

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

use docqa_core::{Embedder, Error, Passage, Result, SearchRequest, SimilaritySearchClient};

struct StoredPassage {
    passage: Passage,
    embedding: Option<Vec<f32>>,
}

/// Local in-memory passage store
///
/// With an [`Embedder`] passages are scored by cosine similarity of their
/// embeddings; without one, by the share of query terms found in the text.
/// Results are ordered by score, ties by insertion order.
pub struct InMemoryPassageStore {
    entries: RwLock<Vec<StoredPassage>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl InMemoryPassageStore {
    /// Create a store that scores by term overlap
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder: None,
        }
    }

    /// Create a store that scores by embedding similarity
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder: Some(embedder),
        }
    }

    /// Add passages, embedding them first when an embedder is configured.
    pub async fn add(&self, passages: Vec<Passage>) -> Result<usize> {
        let embeddings: Vec<Option<Vec<f32>>> = match &self.embedder {
            Some(embedder) if !passages.is_empty() => {
                let texts: Vec<String> = passages.iter().map(|p| p.content.clone()).collect();
                let vectors = embedder.embed(&texts).await?;
                if vectors.len() != passages.len() {
                    return Err(Error::Embedding(format!(
                        "Expected {} embeddings, got {}",
                        passages.len(),
                        vectors.len()
                    )));
                }
                vectors.into_iter().map(Some).collect()
            }
            _ => vec![None; passages.len()],
        };

        let added = passages.len();
        let mut entries = self
            .entries
            .write()
            .map_err(|e| Error::SimilaritySearch(format!("Lock error: {}", e)))?;
        entries.extend(
            passages
                .into_iter()
                .zip(embeddings)
                .map(|(passage, embedding)| StoredPassage { passage, embedding }),
        );
        Ok(added)
    }

    pub fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|e| Error::SimilaritySearch(format!("Lock error: {}", e)))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Simple cosine similarity calculation
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    /// Share of query terms that occur in the content
    fn text_similarity(query_terms: &[String], content: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let content_lower = content.to_lowercase();
        let matches = query_terms
            .iter()
            .filter(|term| content_lower.contains(term.as_str()))
            .count();
        matches as f32 / query_terms.len() as f32
    }

    fn query_terms(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for InMemoryPassageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilaritySearchClient for InMemoryPassageStore {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Passage>> {
        let query_embedding = match &self.embedder {
            Some(embedder) => Some(embedder.embed_one(&request.query).await?),
            None => None,
        };
        let query_terms = Self::query_terms(&request.query);

        let entries = self
            .entries
            .read()
            .map_err(|e| Error::SimilaritySearch(format!("Lock error: {}", e)))?;

        let mut scored: Vec<(f32, &Passage)> = entries
            .iter()
            .filter_map(|entry| {
                let score = match (&query_embedding, &entry.embedding) {
                    (Some(q), Some(e)) => Self::cosine_similarity(q, e),
                    (Some(_), None) => return None,
                    (None, _) => Self::text_similarity(&query_terms, &entry.passage.content),
                };
                Some((score, &entry.passage))
            })
            .filter(|(score, _)| match request.similarity_threshold {
                Some(threshold) => *score >= threshold,
                None => true,
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(request.top_k);

        Ok(scored
            .into_iter()
            .map(|(score, passage)| passage.with_score(score))
            .collect())
    }
}
