//! Text generation trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::{Error, Result};

/// A single generation call: an optional system instruction plus the user turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Opaque conversation identity, forwarded unchanged to the backend.
    pub conversation_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_conversation(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }
}

/// Trait for text generation services (e.g., watsonx.ai, Ollama, etc.)
///
/// Output is not assumed to be deterministic between calls. Implementations
/// must be safe to call from several tasks at once.
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    /// Generate text for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}

/// Run one generation call, failing with [`Error::Timeout`] after `limit`.
pub async fn generate_within<G>(
    client: &G,
    request: &GenerationRequest,
    limit: Duration,
) -> Result<String>
where
    G: TextGenerationClient + ?Sized,
{
    match timeout(limit, client.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!(
            "{} did not respond within {:?}",
            client.model_id(),
            limit
        ))),
    }
}
