//! Passage metadata enrichment

use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use docqa_core::Passage;

const CODE_FENCE: &str = "```";

static API_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(API|endpoint|method)\b").expect("valid regex"));

// camelCase, PascalCase with an inner capital, and UPPER_CASE identifiers
static TECHNICAL_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+[A-Z][a-zA-Z]*|[A-Z_]{2,}|[a-z]+[A-Z][a-zA-Z]*)\b")
        .expect("valid regex")
});

/// Returns a copy of `passage` with the metadata keys the retrieval core reads.
///
/// Keys already present are left as they are.
pub fn enrich_metadata(passage: &Passage) -> Passage {
    let content = &passage.content;
    let mut metadata = passage.metadata.clone();

    metadata
        .entry(Passage::HAS_CODE.to_string())
        .or_insert_with(|| json!(content.contains(CODE_FENCE)));
    metadata
        .entry(Passage::HAS_API_REF.to_string())
        .or_insert_with(|| json!(API_REF.is_match(content)));
    metadata
        .entry(Passage::COMPLEXITY_SCORE.to_string())
        .or_insert_with(|| json!(complexity_score(content)));
    metadata
        .entry(Passage::TECHNICAL_TERMS.to_string())
        .or_insert_with(|| json!(technical_terms(content)));

    Passage {
        metadata,
        ..passage.clone()
    }
}

/// `(2 × code fences + mean sentence length / 100) / 2`
pub fn complexity_score(text: &str) -> f64 {
    let fences = text.matches(CODE_FENCE).count() as f64 * 2.0;

    let mut sentences: Vec<&str> = text.split(['.', '!', '?']).collect();
    while sentences.last().is_some_and(|s| s.is_empty()) {
        sentences.pop();
    }
    let mean_len = if sentences.is_empty() {
        0.0
    } else {
        let total: usize = sentences.iter().map(|s| s.chars().count()).sum();
        total as f64 / sentences.len() as f64
    };

    (fences + mean_len / 100.0) / 2.0
}

/// Identifier-shaped terms in `text`, sorted and de-duplicated.
pub fn technical_terms(text: &str) -> BTreeSet<String> {
    TECHNICAL_TERM
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_code_and_api_flags() {
        let p = enrich_metadata(&Passage::new("Call the endpoint:\n```sh\ncurl localhost\n```"));
        assert_eq!(p.has_code(), Some(true));
        assert_eq!(p.has_api_ref(), Some(true));

        let p = enrich_metadata(&Passage::new("Methods are described elsewhere."));
        assert_eq!(p.has_code(), Some(false));
        assert_eq!(p.has_api_ref(), Some(false));
    }

    #[test]
    fn test_existing_keys_are_kept() {
        let p = Passage::new("```x```").with_metadata(Passage::HAS_CODE, false);
        assert_eq!(enrich_metadata(&p).has_code(), Some(false));
    }

    #[test]
    fn test_complexity_score() {
        // two sentences of 5 and 6 chars, no fences
        assert!((complexity_score("Hello. World.") - 0.0275).abs() < 1e-9);
        // two fences count 4, one sentence of 9 chars
        assert!((complexity_score("a```b```c") - (4.0 + 9.0 / 100.0) / 2.0).abs() < 1e-9);
        assert_eq!(complexity_score(""), 0.0);
    }

    #[test]
    fn test_technical_terms_snapshot() {
        let terms = technical_terms(
            "Create a ChatClient, set TOP_K and call similaritySearch. \
             ChatClient again; plain words.",
        );
        assert_yaml_snapshot!(terms, @r###"
        ---
        - ChatClient
        - TOP_K
        - similaritySearch
        "###);
    }
}
