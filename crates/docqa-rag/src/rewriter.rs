//! Pre-retrieval query rewriting

use std::sync::Arc;
use std::time::Duration;

use docqa_core::{generate_within, GenerationRequest, PromptTemplate, TextGenerationClient};

const REWRITE_PROMPT: &str = "\
Rewrite this query to better retrieve technical documentation.
Focus on:
- Extracting key technical terms
- Identifying the core question
- Adding relevant technical context

Original query: {query}

Respond with only the rewritten query.";

/// Turns a conversational question into a retrieval-oriented query.
pub struct QueryRewriter<G: TextGenerationClient + ?Sized> {
    generator: Arc<G>,
    timeout: Duration,
}

impl<G: TextGenerationClient + ?Sized> QueryRewriter<G> {
    pub fn new(generator: Arc<G>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Rewritten query, or `query` itself if the model fails or returns nothing.
    pub async fn rewrite(&self, query: &str) -> String {
        let prompt = PromptTemplate::new(REWRITE_PROMPT).render(&[("query", query)]);
        let request = GenerationRequest::new(prompt);

        match generate_within(self.generator.as_ref(), &request, self.timeout).await {
            Ok(text) => {
                let rewritten = text.trim().trim_start_matches("Rewritten query:").trim();
                if rewritten.is_empty() {
                    tracing::warn!("Query rewrite returned nothing; using original question");
                    query.to_string()
                } else {
                    rewritten.to_string()
                }
            }
            Err(e) => {
                tracing::warn!("Query rewrite failed: {e}. Using original question");
                query.to_string()
            }
        }
    }
}
