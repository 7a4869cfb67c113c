//! Ollama configuration

use docqa_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Configuration for the Ollama client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Server root without a trailing slash
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            chat_model: "qwen2.5-coder:7b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

impl OllamaConfig {
    /// Defaults overridden by `OLLAMA_BASE_URL`, `OLLAMA_CHAT_MODEL` and
    /// `OLLAMA_EMBEDDING_MODEL`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(base_url) = env::var("OLLAMA_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("OLLAMA_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = env::var("OLLAMA_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }

        config.validated()
    }

    /// Check the base URL and normalize away a trailing slash.
    pub fn validated(mut self) -> Result<Self> {
        let parsed = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("Invalid Ollama base URL {:?}: {}", self.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "Ollama base URL must be http or https, got {}",
                parsed.scheme()
            )));
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        if self.chat_model.trim().is_empty() {
            return Err(Error::Configuration("Ollama chat model must not be empty".to_string()));
        }
        Ok(self)
    }
}
