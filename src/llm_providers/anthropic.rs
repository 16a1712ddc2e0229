//! Anthropic Messages API provider

use super::*;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";

/// Anthropic Claude provider implementation
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn response_text(response: &Value) -> Option<String> {
        let blocks = response["content"].as_array()?;
        let text: String = blocks
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(
        &self,
        prompt: String,
        config: &LLMOptimizerConfig,
    ) -> Result<String, OptimizerError> {
        let request_body = json!({
            "model": self.model,
            "max_tokens": config.max_output_tokens,
            "temperature": config.temperature,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OptimizerError::ExternalServiceError {
                service: "Anthropic".to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OptimizerError::ExternalServiceError {
                service: "Anthropic".to_string(),
                message: format!("API error: {}", error_text),
            });
        }

        let response_json: Value = response.json().await.map_err(|e| {
            OptimizerError::ExternalServiceError {
                service: "Anthropic".to_string(),
                message: e.to_string(),
            }
        })?;

        Self::response_text(&response_json).ok_or_else(|| OptimizerError::ExternalServiceError {
            service: "Anthropic".to_string(),
            message: "No content in response".to_string(),
        })
    }
}
