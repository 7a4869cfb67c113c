//! watsonx.ai configuration

use docqa_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::client::WatsonxClient;

/// Configuration for the watsonx.ai client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatsonxConfig {
    pub api_key: String,
    pub project_id: String,
    pub iam_url: String,
    pub api_url: String,
    pub model_id: String,
    pub max_new_tokens: u32,
}

impl WatsonxConfig {
    pub const DEFAULT_IAM_URL: &'static str = "iam.cloud.ibm.com";
    pub const DEFAULT_API_URL: &'static str = "https://us-south.ml.cloud.ibm.com";
    pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1024;

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("WATSONX_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| {
                Error::Configuration(
                    "WATSONX_API_KEY or API_KEY environment variable not found".to_string(),
                )
            })?;

        let project_id = env::var("WATSONX_PROJECT_ID")
            .or_else(|_| env::var("PROJECT_ID"))
            .map_err(|_| {
                Error::Configuration(
                    "WATSONX_PROJECT_ID or PROJECT_ID environment variable not found".to_string(),
                )
            })?;

        let mut config = Self::new(api_key, project_id);

        if let Ok(iam_url) = env::var("IAM_IBM_CLOUD_URL") {
            config.iam_url = iam_url;
        }
        if let Ok(api_url) = env::var("WATSONX_API_URL") {
            config.api_url = api_url.trim_end_matches('/').to_string();
        }
        if let Ok(model_id) = env::var("WATSONX_MODEL_ID") {
            config.model_id = model_id;
        }

        Ok(config)
    }

    /// Create configuration with explicit credentials and default endpoints
    pub fn new(api_key: String, project_id: String) -> Self {
        Self {
            api_key,
            project_id,
            iam_url: Self::DEFAULT_IAM_URL.to_string(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            model_id: WatsonxClient::GRANITE_3_3_8B_INSTRUCT.to_string(),
            max_new_tokens: Self::DEFAULT_MAX_NEW_TOKENS,
        }
    }
}
