//! LLM provider implementations
//!
//! This module contains implementations for Gemini, Anthropic and (behind the
//! `openai` feature) OpenAI, plus a scriptable mock for tests and offline runs.

use crate::llm_optimizer::{LLMOptimizerConfig, LLMProvider};
use crate::OptimizerError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod anthropic;
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

enum Reply {
    Text(String),
    Fail(String),
}

/// Mock LLM provider for testing
///
/// Rules are checked in insertion order; the first whose key occurs in the prompt
/// decides the reply. Prompts matching no rule get the default response.
pub struct MockProvider {
    name: String,
    rules: Vec<(String, Reply)>,
    default_response: String,
    calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            rules: Vec::new(),
            default_response: "Mock value".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, key: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((key.into(), Reply::Text(response.into())));
        self
    }

    pub fn with_failure(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((key.into(), Reply::Fail(message.into())));
        self
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Number of `generate` calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: String,
        _config: &LLMOptimizerConfig,
    ) -> Result<String, OptimizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let rule = self
            .rules
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()));

        match rule {
            Some((_, Reply::Text(text))) => Ok(text.clone()),
            Some((_, Reply::Fail(message))) => Err(OptimizerError::ExternalServiceError {
                service: self.name.clone(),
                message: message.clone(),
            }),
            None => Ok(self.default_response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockProvider::new()
            .with_response("title", "Better title")
            .with_failure("keywords", "quota exceeded");
        let config = LLMOptimizerConfig::default();

        assert_eq!(
            provider.generate("the title".into(), &config).await.unwrap(),
            "Better title"
        );
        assert_eq!(
            provider.generate("other".into(), &config).await.unwrap(),
            "Mock value"
        );
        assert!(matches!(
            provider.generate("keywords please".into(), &config).await,
            Err(OptimizerError::ExternalServiceError { .. })
        ));
        assert_eq!(provider.call_count(), 3);
    }
}
