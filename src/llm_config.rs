//! LLM configuration and validation utilities

use crate::llm_providers::anthropic::DEFAULT_ANTHROPIC_MODEL;
use crate::llm_providers::gemini::DEFAULT_GEMINI_MODEL;
use crate::{AnthropicProvider, GeminiProvider, LLMProvider, MockProvider, OptimizerError};
use std::sync::Arc;
use tracing::{info, warn};

/// API key validation utilities
pub struct ApiKeyValidator;

impl ApiKeyValidator {
    /// Validate Google AI Studio (Gemini) API key format
    pub fn validate_gemini_key(api_key: &str) -> Result<(), OptimizerError> {
        if api_key.is_empty() {
            return Err(OptimizerError::InvalidConfiguration(
                "Gemini API key cannot be empty".to_string(),
            ));
        }

        if !api_key.starts_with("AIza") {
            return Err(OptimizerError::InvalidConfiguration(
                "Gemini API key must start with 'AIza'".to_string(),
            ));
        }

        if api_key.len() < 30 {
            return Err(OptimizerError::InvalidConfiguration(
                "Gemini API key appears to be too short".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate Anthropic API key format
    pub fn validate_anthropic_key(api_key: &str) -> Result<(), OptimizerError> {
        if api_key.is_empty() {
            return Err(OptimizerError::InvalidConfiguration(
                "Anthropic API key cannot be empty".to_string(),
            ));
        }

        if !api_key.starts_with("sk-ant-") {
            return Err(OptimizerError::InvalidConfiguration(
                "Anthropic API key must start with 'sk-ant-'".to_string(),
            ));
        }

        if api_key.len() < 20 {
            return Err(OptimizerError::InvalidConfiguration(
                "Anthropic API key appears to be too short".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate OpenAI API key format
    pub fn validate_openai_key(api_key: &str) -> Result<(), OptimizerError> {
        if api_key.is_empty() {
            return Err(OptimizerError::InvalidConfiguration(
                "OpenAI API key cannot be empty".to_string(),
            ));
        }

        if !api_key.starts_with("sk-") {
            return Err(OptimizerError::InvalidConfiguration(
                "OpenAI API key must start with 'sk-'".to_string(),
            ));
        }

        if api_key.len() < 20 {
            return Err(OptimizerError::InvalidConfiguration(
                "OpenAI API key appears to be too short".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration helper for LLM providers
pub struct LLMConfig;

impl LLMConfig {
    /// Create Gemini provider from environment variables
    pub fn gemini_from_env() -> Result<GeminiProvider, OptimizerError> {
        let api_key = required_var("GEMINI_API_KEY")?;
        ApiKeyValidator::validate_gemini_key(&api_key)?;

        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        Ok(GeminiProvider::new(api_key).with_model(model))
    }

    /// Create Anthropic provider from environment variables
    pub fn anthropic_from_env() -> Result<AnthropicProvider, OptimizerError> {
        let api_key = required_var("ANTHROPIC_API_KEY")?;
        ApiKeyValidator::validate_anthropic_key(&api_key)?;

        let model = std::env::var("ANTHROPIC_MODEL")
            .unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string());

        Ok(AnthropicProvider::new(api_key).with_model(model))
    }

    /// Create OpenAI provider from environment variables
    #[cfg(feature = "openai")]
    pub fn openai_from_env() -> Result<crate::OpenAIProvider, OptimizerError> {
        let api_key = required_var("OPENAI_API_KEY")?;
        ApiKeyValidator::validate_openai_key(&api_key)?;

        let model = std::env::var("OPENAI_MODEL")
            .unwrap_or_else(|_| crate::llm_providers::openai::DEFAULT_OPENAI_MODEL.to_string());

        Ok(crate::OpenAIProvider::new(api_key).with_model(model))
    }

    /// Build the provider named by `LLM_PROVIDER`, or auto-detect one from the API keys present
    pub fn from_env() -> Result<Arc<dyn LLMProvider>, OptimizerError> {
        match std::env::var("LLM_PROVIDER") {
            Ok(name) => Self::provider_by_name(&name),
            Err(_) => Self::auto_detect_provider(),
        }
    }

    pub fn provider_by_name(name: &str) -> Result<Arc<dyn LLMProvider>, OptimizerError> {
        let provider: Arc<dyn LLMProvider> = match name.to_lowercase().as_str() {
            "gemini" => Arc::new(Self::gemini_from_env()?),
            "anthropic" => Arc::new(Self::anthropic_from_env()?),
            #[cfg(feature = "openai")]
            "openai" => Arc::new(Self::openai_from_env()?),
            "mock" => {
                warn!("Using mock LLM provider, optimizations will contain placeholder text");
                Arc::new(MockProvider::new())
            }
            other => {
                return Err(OptimizerError::InvalidConfiguration(format!(
                    "Unknown LLM provider: {other}"
                )))
            }
        };

        info!(provider = provider.name(), "LLM provider configured");
        Ok(provider)
    }

    /// Try Gemini, then Anthropic, then OpenAI (when compiled in)
    pub fn auto_detect_provider() -> Result<Arc<dyn LLMProvider>, OptimizerError> {
        if let Ok(provider) = Self::gemini_from_env() {
            return Ok(Arc::new(provider));
        }

        if let Ok(provider) = Self::anthropic_from_env() {
            return Ok(Arc::new(provider));
        }

        #[cfg(feature = "openai")]
        if let Ok(provider) = Self::openai_from_env() {
            return Ok(Arc::new(provider));
        }

        Err(OptimizerError::InvalidConfiguration(
            "No LLM provider configured, set GEMINI_API_KEY or LLM_PROVIDER".to_string(),
        ))
    }
}

fn required_var(name: &str) -> Result<String, OptimizerError> {
    std::env::var(name).map_err(|_| {
        OptimizerError::InvalidConfiguration(format!("{name} environment variable not set"))
    })
}
