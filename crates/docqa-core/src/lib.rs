//! Core traits and types for DocQA
//!
//! This crate defines the passage model, the error taxonomy, and the two
//! capability-facing interfaces the retrieval core consumes: a similarity
//! search service and a text generation service. Concrete backends live in
//! their own crates so the pipeline can be exercised against in-process fakes.

pub mod config;
pub mod error;
pub mod llm;
pub mod passage;
pub mod prompt;
pub mod search;

pub use config::{AnswerConfig, DocqaConfig, EmptyFilterPolicy, RetrievalConfig};
pub use error::{Error, Result};
pub use llm::{generate_within, GenerationRequest, TextGenerationClient};
pub use passage::{collapse_duplicates, Metadata, Passage};
pub use prompt::PromptTemplate;
pub use search::{Embedder, SearchRequest, SimilaritySearchClient};
