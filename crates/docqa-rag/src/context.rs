//! Grounding context assembly for the answer prompt

use regex::Regex;
use std::sync::LazyLock;

use docqa_core::{collapse_duplicates, Passage};

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));

/// Collapse runs of blank lines to a single blank line.
pub fn tidy_content(content: &str) -> String {
    EXCESS_BLANK_LINES.replace_all(content, "\n\n").into_owned()
}

/// Tidied passage texts, duplicates removed, separated by blank lines.
pub fn format_context(passages: &[Passage]) -> String {
    let tidied: Vec<Passage> = passages
        .iter()
        .map(|p| Passage {
            content: tidy_content(&p.content),
            ..p.clone()
        })
        .collect();

    collapse_duplicates(tidied)
        .iter()
        .map(|p| p.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_tidy_collapses_blank_runs() {
        assert_eq!(tidy_content("a\n\n\n\nb\n \n\t\nc\n\nd"), "a\n\nb\n\nc\n\nd");
    }

    #[test]
    fn test_format_context_joins_and_dedupes() {
        let passages = vec![
            Passage::new("## Retries\n\n\n\nUse backoff."),
            Passage::new("```rust\nlet x = 1;\n```"),
            Passage::new("## Retries\n\nUse   backoff."),
        ];
        assert_snapshot!(format_context(&passages), @r###"
        ## Retries

        Use backoff.

        ```rust
        let x = 1;
        ```
        "###);
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), "");
    }
}
