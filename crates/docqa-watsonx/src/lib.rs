//! watsonx.ai integration for DocQA
//!
//! This crate provides the watsonx.ai implementation of the
//! `TextGenerationClient` trait.

mod client;
mod config;


pub use client::WatsonxClient;
pub use config::WatsonxConfig;

// Re-export core types for convenience
pub use docqa_core::{Error, GenerationRequest, Result, TextGenerationClient};
