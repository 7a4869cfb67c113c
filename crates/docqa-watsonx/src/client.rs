//! watsonx.ai client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docqa_core::{Error, GenerationRequest, Result, TextGenerationClient};

use crate::config::WatsonxConfig;

/// watsonx.ai text generation client
///
/// Call [`WatsonxClient::connect`] once to obtain an IAM token before
/// sharing the client.
pub struct WatsonxClient {
    config: WatsonxConfig,
    access_token: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct TokenRequest {
    grant_type: String,
    apikey: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationParams {
    decoding_method: String,
    max_new_tokens: u32,
    min_new_tokens: u32,
    repetition_penalty: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerationBody {
    input: String,
    parameters: GenerationParams,
    model_id: String,
    project_id: String,
}

#[derive(Deserialize)]
struct GenerationResults {
    generated_text: String,
}

#[derive(Deserialize)]
struct GenerationData {
    results: Vec<GenerationResults>,
}

impl WatsonxClient {
    /// Model constants
    pub const GRANITE_4_H_SMALL: &'static str = "ibm/granite-4-h-small";
    pub const GRANITE_3_3_8B_INSTRUCT: &'static str = "ibm/granite-3-3-8b-instruct";

    /// Create a new client from configuration
    pub fn new(config: WatsonxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            access_token: None,
            client,
        })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = WatsonxConfig::from_env()?;
        Self::new(config)
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.config.model_id = model_id.into();
        self
    }

    /// Exchange the API key for an IAM access token
    pub async fn connect(&mut self) -> Result<()> {
        let token_request = TokenRequest {
            grant_type: "urn:ibm:params:oauth:grant-type:apikey".to_string(),
            apikey: self.config.api_key.clone(),
        };

        let url = format!("https://{}/identity/token", self.config.iam_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&token_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Authentication(format!(
                "Authentication failed: {}",
                response.status()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        self.access_token = Some(token_response.access_token);
        tracing::debug!("Authenticated with watsonx.ai");

        Ok(())
    }

    /// The text-generation endpoint has no separate system role, so the
    /// system instruction is prepended to the input.
    pub(crate) fn request_body(&self, request: &GenerationRequest) -> GenerationBody {
        let input = match &request.system {
            Some(system) if !system.trim().is_empty() => {
                format!("{}\n\n{}", system.trim_end(), request.prompt)
            }
            _ => request.prompt.clone(),
        };

        GenerationBody {
            input,
            parameters: GenerationParams {
                decoding_method: "greedy".to_string(),
                max_new_tokens: self.config.max_new_tokens,
                min_new_tokens: 1,
                repetition_penalty: 1.1,
            },
            model_id: self.config.model_id.clone(),
            project_id: self.config.project_id.clone(),
        }
    }
}

/// Concatenate the generated text of every `data: ` event in an SSE body.
pub(crate) fn collect_stream_text(body: &str) -> String {
    let mut answer = String::new();

    for line in body.lines() {
        let Some(json_data) = line.strip_prefix("data: ") else {
            continue;
        };
        let json_data = json_data.trim();
        if json_data.is_empty() || json_data == "[DONE]" {
            continue;
        }

        match serde_json::from_str::<GenerationData>(json_data) {
            Ok(data) => {
                if let Some(result) = data.results.first() {
                    answer.push_str(&result.generated_text);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to parse response line: {} - Error: {}", json_data, e);
            }
        }
    }

    answer
}

/// Trim the reply and drop a leading `Answer:` label.
pub(crate) fn clean_answer(answer: &str) -> String {
    let trimmed = answer.trim();
    trimmed
        .strip_prefix("Answer:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

#[async_trait]
impl TextGenerationClient for WatsonxClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let access_token = self.access_token.as_ref().ok_or_else(|| {
            Error::Authentication("Not authenticated. Call connect() first.".to_string())
        })?;

        if let Some(conversation_id) = &request.conversation_id {
            tracing::debug!(
                "watsonx.ai keeps no session state; ignoring conversation {conversation_id}"
            );
        }

        let url = format!(
            "{}/ml/v1/text/generation_stream?version=2023-05-29",
            self.config.api_url
        );

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", access_token))
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Generation(format!(
                "watsonx.ai request failed with status {}: {}",
                status, error_text
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let answer = clean_answer(&collect_stream_text(&response_text));
        if answer.is_empty() {
            return Err(Error::Generation(format!(
                "Empty response from watsonx.ai. Raw response: {}",
                response_text
            )));
        }

        Ok(answer)
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}
