use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

mod config;
mod error;
mod extractor;
mod fetcher;
mod llm_config;
mod llm_optimizer;
mod llm_providers;
#[cfg(feature = "logging")]
mod logging;
mod migrations;
mod optimization_service;
#[cfg(feature = "server")]
mod server;
mod storage;
mod utils;

pub use config::AppConfig;
pub use error::OptimizerError;
pub use extractor::{ListingExtractor, DESCRIPTION_PLACEHOLDER, MAX_LANDMARK_DISTANCE};
pub use fetcher::{Fetcher, FetcherConfig};
pub use llm_config::{ApiKeyValidator, LLMConfig};
pub use llm_optimizer::{
    parse_keywords, parse_optimized_bullets, LLMOptimizerConfig, LLMProvider, ListingOptimizer,
    BULLETS_PLACEHOLDER,
};
pub use llm_providers::anthropic::AnthropicProvider;
pub use llm_providers::gemini::GeminiProvider;
#[cfg(feature = "openai")]
pub use llm_providers::openai::OpenAIProvider;
pub use llm_providers::MockProvider;
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_optimization_card, setup_logging, LogConfig};
pub use migrations::{Migration, MigrationRunner, MigrationStatus, MIGRATIONS};
pub use optimization_service::OptimizationService;
#[cfg(feature = "server")]
pub use server::{router, serve, AppState};
pub use storage::{
    NewOptimization, OptimizationRecord, OptimizationStore, OptimizationSummary, SqliteStore,
    SummaryListing,
};
pub use utils::{normalize_whitespace, truncate_str};

/// Amazon Standard Identification Number: exactly ten ASCII uppercase letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Asin(String);

impl Asin {
    pub const LEN: usize = 10;

    pub fn parse(raw: &str) -> Result<Self, OptimizerError> {
        let valid = raw.len() == Self::LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(OptimizerError::InvalidAsin(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Asin {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Asin::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Listing fields as scraped from the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListing {
    pub title: String,
    pub bullets: Vec<String>,
    pub description: String,
}

/// Model-generated copy plus keyword suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedListing {
    pub title: String,
    pub bullets: Vec<String>,
    pub description: String,
    pub keywords: Vec<String>,
}

/// What a successful optimize call hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub id: i64,
    pub asin: Asin,
    pub original: ProductListing,
    pub optimized: OptimizedListing,
}

/// Source of raw product page markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_product_page(&self, asin: &Asin) -> Result<String, OptimizerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_asins() {
        for raw in ["B08N5WRWNW", "0123456789", "ABCDEFGHIJ"] {
            assert_eq!(Asin::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_invalid_asins() {
        for raw in [
            "",
            "B08N5WRWN",
            "B08N5WRWNWX",
            "b08n5wrwnw",
            "B08N5-RWNW",
            " B08N5WRWN",
            "B08N5WRWNÉ",
        ] {
            assert!(
                matches!(Asin::parse(raw), Err(OptimizerError::InvalidAsin(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_asin_serde() {
        let asin = Asin::parse("B08N5WRWNW").unwrap();
        assert_eq!(serde_json::to_string(&asin).unwrap(), "\"B08N5WRWNW\"");
        assert!(serde_json::from_str::<Asin>("\"nope\"").is_err());
    }
}
