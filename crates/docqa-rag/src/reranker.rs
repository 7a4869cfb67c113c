//! LLM reranking and parsing of the returned index list

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use docqa_core::{
    generate_within, GenerationRequest, Passage, PromptTemplate, RetrievalConfig,
    TextGenerationClient,
};

const RERANK_PROMPT: &str = "\
Rate how relevant each document is to answering this query.
Query: {query}

Documents:
{documents}

Return only a comma-separated list of document indices (0-based)
in order of relevance (most relevant first).
Example: 2,0,4,1,3";

/// Result of turning a model reply into a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingOutcome {
    /// Validated indices into the input, most relevant first.
    Parsed(Vec<usize>),
    /// The reply was unusable; the input order is kept. Carries the reason.
    Fallback(String),
    /// Fewer than two candidates, so no model call was made.
    Skipped,
}

/// Parse a comma-separated index list for `candidate_count` candidates.
///
/// Every non-empty token must be an integer, otherwise the whole reply is
/// rejected. Integers outside `[0, candidate_count)`, however large, are
/// dropped, and so are repeats of an index already seen. A reply with no
/// surviving index is rejected as well.
pub fn parse_ranking(reply: &str, candidate_count: usize) -> RankingOutcome {
    let reply = reply.trim();
    if reply.is_empty() {
        return RankingOutcome::Fallback("empty response".to_string());
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();

    for token in reply.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let index: i64 = match token.parse() {
            Ok(index) => index,
            // Too large for i64, so certainly out of range.
            Err(_) if is_integer_literal(token) => continue,
            Err(_) => return RankingOutcome::Fallback(format!("non-numeric token {token:?}")),
        };

        let Ok(index) = usize::try_from(index) else {
            continue;
        };
        if index < candidate_count && seen.insert(index) {
            order.push(index);
        }
    }

    if order.is_empty() {
        return RankingOutcome::Fallback("no valid indices".to_string());
    }

    RankingOutcome::Parsed(order)
}

fn is_integer_literal(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Orders candidates by asking the generation model for a relevance ranking.
///
/// Reranking is a quality optimization: any failure (backend error, timeout,
/// unparseable reply) returns the candidates in their original order.
pub struct Reranker<G: TextGenerationClient + ?Sized> {
    generator: Arc<G>,
    snippet_chars: usize,
    timeout: Duration,
}

impl<G: TextGenerationClient + ?Sized> Reranker<G> {
    pub fn new(generator: Arc<G>, config: &RetrievalConfig) -> Self {
        Self {
            generator,
            snippet_chars: config.rerank_snippet_chars,
            timeout: config.rerank_timeout,
        }
    }

    /// One prompt listing every candidate as `[i] <snippet>`.
    pub fn prompt(&self, query: &str, candidates: &[Passage]) -> String {
        let documents: String = candidates
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let snippet: String = p.content.chars().take(self.snippet_chars).collect();
                format!("[{i}] {snippet}\n\n")
            })
            .collect();

        PromptTemplate::new(RERANK_PROMPT).render(&[("query", query), ("documents", &documents)])
    }

    pub async fn rerank(&self, query: &str, candidates: Vec<Passage>) -> Vec<Passage> {
        self.rerank_with_outcome(query, candidates).await.0
    }

    /// Reordered candidates (possibly a strict subset) and how they were obtained.
    pub async fn rerank_with_outcome(
        &self,
        query: &str,
        candidates: Vec<Passage>,
    ) -> (Vec<Passage>, RankingOutcome) {
        if candidates.len() < 2 {
            return (candidates, RankingOutcome::Skipped);
        }

        let request = GenerationRequest::new(self.prompt(query, &candidates));
        let outcome = match generate_within(self.generator.as_ref(), &request, self.timeout).await {
            Ok(reply) => parse_ranking(&reply, candidates.len()),
            Err(e) => RankingOutcome::Fallback(e.to_string()),
        };

        match &outcome {
            RankingOutcome::Parsed(order) => {
                if order.len() < candidates.len() {
                    tracing::debug!(
                        "Reranker kept {} of {} candidates",
                        order.len(),
                        candidates.len()
                    );
                }
                let ranked = apply_order(candidates, order);
                (ranked, outcome)
            }
            RankingOutcome::Fallback(reason) => {
                tracing::warn!("Reranking fell back to similarity order: {reason}");
                (candidates, outcome)
            }
            RankingOutcome::Skipped => (candidates, outcome),
        }
    }
}

/// Move candidates into `order`. Indices must be unique and in range.
fn apply_order(candidates: Vec<Passage>, order: &[usize]) -> Vec<Passage> {
    let mut slots: Vec<Option<Passage>> = candidates.into_iter().map(Some).collect();
    order.iter().filter_map(|&i| slots.get_mut(i)?.take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{contents, passages, text, Reply, ScriptedGenerator};
    use insta::assert_snapshot;

    fn reranker(replies: Vec<Reply>) -> (Reranker<ScriptedGenerator>, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let config = RetrievalConfig {
            rerank_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        (Reranker::new(generator.clone(), &config), generator)
    }

    #[test]
    fn test_parse_drops_out_of_range() {
        assert_eq!(parse_ranking("2,0,4,1,3", 3), RankingOutcome::Parsed(vec![2, 0, 1]));
    }

    #[test]
    fn test_parse_trims_whitespace_and_newlines() {
        assert_eq!(parse_ranking(" 1 , 0\n", 2), RankingOutcome::Parsed(vec![1, 0]));
    }

    #[test]
    fn test_parse_keeps_first_of_repeated_index() {
        assert_eq!(parse_ranking("1,1,0,1", 3), RankingOutcome::Parsed(vec![1, 0]));
    }

    #[test]
    fn test_parse_discards_negative_indices() {
        assert_eq!(parse_ranking("-1,0", 2), RankingOutcome::Parsed(vec![0]));
    }

    #[test]
    fn test_parse_drops_index_too_large_for_i64() {
        assert_eq!(
            parse_ranking("2,99999999999999999999,0", 3),
            RankingOutcome::Parsed(vec![2, 0])
        );
        assert_eq!(
            parse_ranking("-99999999999999999999,1", 3),
            RankingOutcome::Parsed(vec![1])
        );
    }

    #[test]
    fn test_parse_tolerates_trailing_comma() {
        assert_eq!(parse_ranking("2,0,", 3), RankingOutcome::Parsed(vec![2, 0]));
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_ranking("The most relevant is 2, then 0", 3),
            RankingOutcome::Fallback(_)
        ));
        assert!(matches!(parse_ranking("2;0;1", 3), RankingOutcome::Fallback(_)));
        assert!(matches!(parse_ranking("", 3), RankingOutcome::Fallback(_)));
    }

    #[test]
    fn test_parse_rejects_all_out_of_range() {
        assert_eq!(
            parse_ranking("7,9", 3),
            RankingOutcome::Fallback("no valid indices".to_string())
        );
    }

    #[test]
    fn test_prompt_labels_and_truncates_candidates() {
        let (reranker, _) = reranker(vec![]);
        let long = "x".repeat(400);
        let prompt = reranker.prompt("retry policy", &[Passage::new("short"), Passage::new(long)]);

        assert!(prompt.contains("Query: retry policy"));
        assert!(prompt.contains("[0] short\n\n"));
        assert!(prompt.contains(&format!("[1] {}\n\n", "x".repeat(300))));
        assert!(!prompt.contains(&"x".repeat(301)));
    }

    #[test]
    fn test_prompt_truncates_on_char_boundaries() {
        let config = RetrievalConfig {
            rerank_snippet_chars: 3,
            ..Default::default()
        };
        let reranker = Reranker::new(Arc::new(ScriptedGenerator::new(vec![])), &config);
        let prompt = reranker.prompt("q", &[Passage::new("héllo"), Passage::new("ok")]);
        assert_snapshot!(prompt, @r###"
        Rate how relevant each document is to answering this query.
        Query: q

        Documents:
        [0] hél

        [1] ok



        Return only a comma-separated list of document indices (0-based)
        in order of relevance (most relevant first).
        Example: 2,0,4,1,3
        "###);
    }

    #[tokio::test]
    async fn test_rerank_applies_parsed_order() {
        let (reranker, generator) = reranker(vec![text("2,0,4,1,3")]);
        let (out, outcome) = reranker.rerank_with_outcome("q", passages(3)).await;

        assert_eq!(contents(&out), vec!["p2", "p0", "p1"]);
        assert_eq!(outcome, RankingOutcome::Parsed(vec![2, 0, 1]));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rerank_may_return_strict_subset() {
        let (reranker, _) = reranker(vec![text("3,1")]);
        let out = reranker.rerank("q", passages(4)).await;
        assert_eq!(contents(&out), vec!["p3", "p1"]);
    }

    #[tokio::test]
    async fn test_malformed_reply_keeps_input_order() {
        let (reranker, _) = reranker(vec![text("I think document two is best.")]);
        let out = reranker.rerank("q", passages(3)).await;
        assert_eq!(out, passages(3));
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_input_order() {
        let (reranker, _) = reranker(vec![Reply::Fail]);
        let (out, outcome) = reranker.rerank_with_outcome("q", passages(3)).await;
        assert_eq!(out, passages(3));
        assert!(matches!(outcome, RankingOutcome::Fallback(_)));
    }

    #[tokio::test]
    async fn test_timeout_keeps_input_order() {
        let (reranker, _) = reranker(vec![Reply::Hang]);
        let out = reranker.rerank("q", passages(3)).await;
        assert_eq!(out, passages(3));
    }

    #[tokio::test]
    async fn test_single_candidate_skips_model() {
        let (reranker, generator) = reranker(vec![]);
        let (out, outcome) = reranker.rerank_with_outcome("q", passages(1)).await;
        assert_eq!(out, passages(1));
        assert_eq!(outcome, RankingOutcome::Skipped);
        assert_eq!(generator.call_count(), 0);
    }
}
