//! Tunable configuration for retrieval and answer generation

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, PromptTemplate, Result};

/// Persona for the final answer call. `{domain}` is filled by the generator.
pub const DEFAULT_SYSTEM_PERSONA: &str = "\
You are a technical documentation assistant{domain}.

RESPONSE GUIDELINES:
1. Answer directly and concisely
2. Use technical terminology naturally
3. Include code examples when relevant
4. Structure your answer with markdown formatting
5. NEVER mention \"based on the provided documents\" or similar phrases
6. If information is insufficient, state what you can answer and what's unclear
7. Format code blocks with proper language identifiers

CRITICAL: Respond as if this information is your native knowledge.
Focus on the answer, not the source of information.";

/// What the metadata filter does when its heuristic would remove every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyFilterPolicy {
    /// Return the unfiltered candidates instead of nothing.
    #[default]
    FallBackToUnfiltered,
    /// Return the empty set.
    KeepEmpty,
}

/// Configuration for the hybrid retrieval pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Width of the candidate pool requested from similarity search
    pub initial_top_k: usize,
    /// Minimum similarity for the first search attempt
    pub similarity_threshold: f32,
    /// Number of passages returned by `search`
    pub final_top_k: usize,
    /// Characters of each candidate shown to the reranker
    pub rerank_snippet_chars: usize,
    /// Word budget stated in the expansion prompt
    pub expansion_max_words: usize,
    /// Lowercase substrings that mark a query as asking for code
    pub code_query_keywords: Vec<String>,
    pub empty_filter_policy: EmptyFilterPolicy,
    pub expansion_timeout: Duration,
    pub rerank_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            initial_top_k: 20,
            similarity_threshold: 0.65,
            final_top_k: 5,
            rerank_snippet_chars: 300,
            expansion_max_words: 50,
            code_query_keywords: vec!["code".to_string(), "example".to_string()],
            empty_filter_policy: EmptyFilterPolicy::default(),
            expansion_timeout: Duration::from_secs(30),
            rerank_timeout: Duration::from_secs(30),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_top_k == 0 {
            return Err(Error::Configuration("initial_top_k must be positive".to_string()));
        }
        if self.final_top_k == 0 {
            return Err(Error::Configuration("final_top_k must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Configuration(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.rerank_snippet_chars == 0 {
            return Err(Error::Configuration(
                "rerank_snippet_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the final answer step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    pub system_persona: PromptTemplate,
    /// Domain label used when the caller does not pass one
    pub domain: String,
    pub answer_timeout: Duration,
    /// Rewrite the question into a retrieval query before searching
    pub rewrite_query: bool,
    pub rewrite_timeout: Duration,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            system_persona: PromptTemplate::new(DEFAULT_SYSTEM_PERSONA),
            domain: String::new(),
            answer_timeout: Duration::from_secs(120),
            rewrite_query: false,
            rewrite_timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocqaConfig {
    pub retrieval: RetrievalConfig,
    pub answer: AnswerConfig,
}

impl DocqaConfig {
    /// Defaults overridden by `DOCQA_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        let retrieval = &mut config.retrieval;

        override_from_env("DOCQA_INITIAL_TOP_K", &mut retrieval.initial_top_k);
        override_from_env("DOCQA_SIMILARITY_THRESHOLD", &mut retrieval.similarity_threshold);
        override_from_env("DOCQA_FINAL_TOP_K", &mut retrieval.final_top_k);
        override_from_env("DOCQA_RERANK_SNIPPET_CHARS", &mut retrieval.rerank_snippet_chars);
        override_from_env("DOCQA_EXPANSION_MAX_WORDS", &mut retrieval.expansion_max_words);

        let mut stage_secs: Option<u64> = None;
        override_optional_secs("DOCQA_STAGE_TIMEOUT_SECS", &mut stage_secs);
        if let Some(secs) = stage_secs {
            retrieval.expansion_timeout = Duration::from_secs(secs);
            retrieval.rerank_timeout = Duration::from_secs(secs);
            config.answer.rewrite_timeout = Duration::from_secs(secs);
        }

        let mut answer_secs: Option<u64> = None;
        override_optional_secs("DOCQA_ANSWER_TIMEOUT_SECS", &mut answer_secs);
        if let Some(secs) = answer_secs {
            config.answer.answer_timeout = Duration::from_secs(secs);
        }

        override_from_env("DOCQA_REWRITE_QUERY", &mut config.answer.rewrite_query);
        if let Ok(domain) = env::var("DOCQA_DOMAIN") {
            config.answer.domain = domain;
        }

        config.retrieval.validate()?;
        Ok(config)
    }
}

/// Parse `key` into the slot when set; unparseable values leave it alone.
fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = env::var(key) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!("Ignoring unparseable value for {}: {:?}", key, raw),
        }
    }
}

fn override_optional_secs(key: &str, slot: &mut Option<u64>) {
    if let Ok(raw) = env::var(key) {
        match raw.trim().parse() {
            Ok(secs) => *slot = Some(secs),
            Err(_) => tracing::warn!("Ignoring unparseable value for {}: {:?}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_defaults_validate() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_top_k, 20);
        assert_eq!(config.final_top_k, 5);
        assert_eq!(config.rerank_snippet_chars, 300);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RetrievalConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = RetrievalConfig {
            final_top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_policy_serializes_to_snake_case() {
        assert_yaml_snapshot!(
            vec![EmptyFilterPolicy::FallBackToUnfiltered, EmptyFilterPolicy::KeepEmpty],
            @r###"
        ---
        - fall_back_to_unfiltered
        - keep_empty
        "###
        );
    }
}
