//! LLM-powered query expansion

use std::sync::Arc;
use std::time::Duration;

use docqa_core::{
    generate_within, GenerationRequest, PromptTemplate, RetrievalConfig, TextGenerationClient,
};

const EXPANSION_PROMPT: &str = "\
Expand this technical query by identifying:
1. Key technical terms and their synonyms
2. Related concepts
3. Common variations (camelCase, snake_case, etc.)

Original query: {query}

Respond with only the expanded query terms, comma-separated.
Keep it concise (max {max_words} words).";

/// How an expansion attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionOutcome {
    Expanded,
    /// The model answered with nothing but whitespace.
    Empty,
    /// The call failed or timed out; carries the error message.
    Failed(String),
}

/// The query to search with, and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub query: String,
    pub outcome: ExpansionOutcome,
}

/// Enriches a query with synonyms and spelling variants.
///
/// The original query is always the verbatim prefix of the result, so exact
/// term recall is never worse than searching without expansion.
pub struct QueryExpander<G: TextGenerationClient + ?Sized> {
    generator: Arc<G>,
    max_words: usize,
    timeout: Duration,
}

impl<G: TextGenerationClient + ?Sized> QueryExpander<G> {
    pub fn new(generator: Arc<G>, config: &RetrievalConfig) -> Self {
        Self {
            generator,
            max_words: config.expansion_max_words,
            timeout: config.expansion_timeout,
        }
    }

    pub fn prompt(&self, query: &str) -> String {
        let max_words = self.max_words.to_string();
        PromptTemplate::new(EXPANSION_PROMPT).render(&[("query", query), ("max_words", &max_words)])
    }

    /// Expanded query, or `query` unchanged when expansion is unavailable.
    pub async fn expand(&self, query: &str) -> String {
        self.expand_with_outcome(query).await.query
    }

    pub async fn expand_with_outcome(&self, query: &str) -> Expansion {
        let request = GenerationRequest::new(self.prompt(query));

        match generate_within(self.generator.as_ref(), &request, self.timeout).await {
            Ok(text) => {
                let terms = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if terms.is_empty() {
                    tracing::warn!(
                        "Query expansion returned no terms; searching with original query"
                    );
                    Expansion {
                        query: query.to_string(),
                        outcome: ExpansionOutcome::Empty,
                    }
                } else {
                    tracing::debug!("Expanded query with {} extra words", terms.split(' ').count());
                    Expansion {
                        query: format!("{query} {terms}"),
                        outcome: ExpansionOutcome::Expanded,
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Query expansion failed: {e}. Searching with original query");
                Expansion {
                    query: query.to_string(),
                    outcome: ExpansionOutcome::Failed(e.to_string()),
                }
            }
        }
    }
}
