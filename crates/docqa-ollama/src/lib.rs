//! Ollama integration for DocQA
//!
//! Chat completions through `/api/chat` and batched embeddings through
//! `/api/embed` on a local or remote Ollama server.

mod client;
mod config;

pub use client::OllamaClient;
pub use config::OllamaConfig;

pub use docqa_core::{Embedder, Error, GenerationRequest, Result, TextGenerationClient};
