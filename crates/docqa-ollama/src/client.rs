//! Ollama chat and embedding client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docqa_core::{Embedder, Error, GenerationRequest, Result, TextGenerationClient};

use crate::config::OllamaConfig;

/// Texts per `/api/embed` call
const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Message,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let config = config.validated()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env()?)
    }

    fn chat_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(Message {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: self.config.chat_model.clone(),
            messages,
            stream: false,
        }
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to call Ollama {path}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Ollama {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| {
                Error::Serialization(format!("Failed to parse Ollama {path} response: {e}"))
            })
    }
}

#[async_trait]
impl TextGenerationClient for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = self.chat_request(request);
        let response: ChatResponse = self.post_json("/api/chat", &body).await?;
        Ok(response.message.content.trim().to_string())
    }

    fn model_id(&self) -> &str {
        &self.config.chat_model
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbedRequest {
                model: self.config.embedding_model.clone(),
                input: chunk.to_vec(),
                truncate: true,
            };
            let response: EmbedResponse = self.post_json("/api/embed", &request).await?;
            if response.embeddings.len() != chunk.len() {
                return Err(Error::Embedding(format!(
                    "Ollama returned {} embeddings for {} inputs",
                    response.embeddings.len(),
                    chunk.len()
                )));
            }
            all_embeddings.extend(response.embeddings);
        }

        tracing::debug!("Embedded {} texts with {}", texts.len(), self.config.embedding_model);
        Ok(all_embeddings)
    }
}
