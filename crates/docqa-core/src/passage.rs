//! Passage value type and duplicate collapsing

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Free-form passage metadata. Keys the core understands are listed on [`Passage`].
pub type Metadata = BTreeMap<String, Value>;

/// A retrievable unit of document text.
///
/// Passages are built once from a similarity search response and never
/// mutated afterwards; every transformation returns a new value.
///
/// Recognized metadata keys:
/// - `has_code` (bool): content contains a fenced code block
/// - `has_api_ref` (bool): content mentions an API, endpoint or method
/// - `complexity_score` (float)
/// - `technical_terms` (array of strings, or a comma-separated string)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f32>,
}

impl Passage {
    pub const HAS_CODE: &'static str = "has_code";
    pub const HAS_API_REF: &'static str = "has_api_ref";
    pub const COMPLEXITY_SCORE: &'static str = "complexity_score";
    pub const TECHNICAL_TERMS: &'static str = "technical_terms";

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
            similarity_score: None,
        }
    }

    /// Returns a copy carrying the given similarity score.
    pub fn with_score(&self, score: f32) -> Self {
        Self {
            similarity_score: Some(score),
            ..self.clone()
        }
    }

    /// Returns a copy with one metadata entry set.
    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.insert(key.into(), value.into());
        Self {
            metadata,
            ..self.clone()
        }
    }

    /// `has_code` flag, or `None` when the key is absent or not a boolean.
    ///
    /// The strings `"true"` and `"false"` are accepted as well, since some
    /// index formats flatten all metadata to strings.
    pub fn has_code(&self) -> Option<bool> {
        self.bool_flag(Self::HAS_CODE)
    }

    pub fn has_api_ref(&self) -> Option<bool> {
        self.bool_flag(Self::HAS_API_REF)
    }

    pub fn complexity_score(&self) -> Option<f64> {
        self.metadata.get(Self::COMPLEXITY_SCORE).and_then(Value::as_f64)
    }

    /// Technical terms in metadata order, empty when the key is absent.
    pub fn technical_terms(&self) -> Vec<String> {
        match self.metadata.get(Self::TECHNICAL_TERMS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(joined)) => joined
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Content with every whitespace run collapsed to a single space.
    ///
    /// Two passages with equal normalized content are duplicates.
    pub fn normalized_content(&self) -> String {
        self.content.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn bool_flag(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Collapse duplicate passages, preserving first-occurrence order.
///
/// The first-seen passage keeps its content, score and metadata values.
/// Metadata keys that only appear on later duplicates are added to it.
pub fn collapse_duplicates(passages: Vec<Passage>) -> Vec<Passage> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Passage> = Vec::with_capacity(passages.len());

    for passage in passages {
        let key = passage.normalized_content();
        match positions.get(&key) {
            Some(&index) => {
                let kept = &mut unique[index];
                for (k, v) in passage.metadata {
                    kept.metadata.entry(k).or_insert(v);
                }
            }
            None => {
                positions.insert(key, unique.len());
                unique.push(passage);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_code_reads_bool_and_string_flags() {
        let p = Passage::new("x").with_metadata(Passage::HAS_CODE, true);
        assert_eq!(p.has_code(), Some(true));

        let p = Passage::new("x").with_metadata(Passage::HAS_CODE, "false");
        assert_eq!(p.has_code(), Some(false));

        let p = Passage::new("x").with_metadata(Passage::HAS_CODE, 3);
        assert_eq!(p.has_code(), None);

        assert_eq!(Passage::new("x").has_code(), None);
    }

    #[test]
    fn test_with_metadata_leaves_original_untouched() {
        let original = Passage::new("body");
        let decorated = original.with_metadata("source", "guide.md");
        assert!(original.metadata.is_empty());
        assert_eq!(decorated.metadata.get("source"), Some(&json!("guide.md")));
    }

    #[test]
    fn test_technical_terms_accepts_array_or_joined_string() {
        let p = Passage::new("x")
            .with_metadata(Passage::TECHNICAL_TERMS, json!(["ChatClient", "TOP_K"]));
        assert_eq!(p.technical_terms(), vec!["ChatClient", "TOP_K"]);

        let p = Passage::new("x").with_metadata(Passage::TECHNICAL_TERMS, "vectorStore, API ,");
        assert_eq!(p.technical_terms(), vec!["vectorStore", "API"]);
    }

    #[test]
    fn test_collapse_duplicates_first_seen_wins() {
        let first = Passage::new("Use  the\nclient")
            .with_score(0.9)
            .with_metadata(Passage::HAS_CODE, false);
        let second = Passage::new("Use the client")
            .with_score(0.4)
            .with_metadata(Passage::HAS_CODE, true)
            .with_metadata("source", "b.md");
        let other = Passage::new("Something else");

        let collapsed = collapse_duplicates(vec![first, other.clone(), second]);

        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].content, "Use  the\nclient");
        assert_eq!(collapsed[0].similarity_score, Some(0.9));
        assert_eq!(collapsed[0].has_code(), Some(false));
        assert_eq!(collapsed[0].metadata.get("source"), Some(&json!("b.md")));
        assert_eq!(collapsed[1], other);
    }
}
