//! Loading a directory of documentation into the passage store

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use docqa_rag::{enrich_metadata, InMemoryPassageStore, Passage};

const EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Character-window chunking settings
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Split `content` into windows of `chunk_size` chars that overlap by `chunk_overlap`.
pub fn chunk_text(content: &str, config: ChunkConfig) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let size = config.chunk_size.max(1);
    let step = size.saturating_sub(config.chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }

        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Documentation files under `root`, sorted for a stable load order.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e.to_lowercase().as_str()))
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Chunk and enrich every documentation file under `root`.
///
/// A missing `root` is an empty corpus, not an error.
pub fn load_passages(root: &Path, config: ChunkConfig) -> Result<Vec<Passage>> {
    let mut passages = Vec::new();

    if !root.exists() {
        tracing::warn!("Corpus directory {} does not exist; starting empty", root.display());
        return Ok(passages);
    }

    for path in collect_files(root)? {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let source = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        let chunks = chunk_text(&content, config);
        let total = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let passage = Passage::new(chunk)
                .with_metadata("source", source.clone())
                .with_metadata("chunk_index", json!(i))
                .with_metadata("total_chunks", json!(total));
            passages.push(enrich_metadata(&passage));
        }
    }

    Ok(passages)
}

/// Load `root` into `store`, returning the number of passages added.
pub async fn index_directory(store: &InMemoryPassageStore, root: &Path) -> Result<usize> {
    let passages = load_passages(root, ChunkConfig::default())?;
    let added = store
        .add(passages)
        .await
        .with_context(|| format!("Failed to index {}", root.display()))?;
    tracing::info!("Indexed {} passages from {}", added, root.display());
    Ok(added)
}
