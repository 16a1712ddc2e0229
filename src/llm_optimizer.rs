//! LLM-based listing optimization
//!
//! Builds the four rewrite prompts for a scraped listing, runs them concurrently
//! against an [`LLMProvider`] and turns the free-form replies into typed fields.

use crate::utils::truncate_str;
use crate::{OptimizedListing, OptimizerError, ProductListing};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument, warn};

/// Returned instead of calling the model when the listing has no bullets.
pub const BULLETS_PLACEHOLDER: &str = "Feature information not available";

/// Characters of the original description quoted in the keyword prompt.
const KEYWORD_CONTEXT_WIDTH: usize = 200;

static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").expect("valid bullet regex"));

static KEYWORD_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[\d\-*.•]+\s*").expect("valid keyword regex"));

/// Generation parameters passed to every provider call
#[derive(Clone, Debug)]
pub struct LLMOptimizerConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Upper bound on list entries recovered by the line-based fallback parser
    pub max_list_items: usize,
}

impl Default for LLMOptimizerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1024,
            max_list_items: 5,
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the name of the provider
    fn name(&self) -> &str;

    /// Generate a text completion for a single prompt
    async fn generate(
        &self,
        prompt: String,
        config: &LLMOptimizerConfig,
    ) -> Result<String, OptimizerError>;
}

pub struct ListingOptimizer {
    provider: Arc<dyn LLMProvider>,
    config: LLMOptimizerConfig,
}

impl ListingOptimizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_config(provider, LLMOptimizerConfig::default())
    }

    pub fn with_config(provider: Arc<dyn LLMProvider>, config: LLMOptimizerConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run all four rewrites concurrently.
    ///
    /// Every request is driven to completion even if another one fails; the combined
    /// result is an error as soon as any single request failed.
    #[instrument(level = "debug", skip_all, fields(provider = %self.provider.name()))]
    pub async fn optimize(
        &self,
        listing: &ProductListing,
    ) -> Result<OptimizedListing, OptimizerError> {
        info!("Starting parallel AI optimization (4 tasks)");

        let (title, bullets, description, keywords) = futures::join!(
            self.optimize_title(&listing.title),
            self.optimize_bullets(&listing.bullets),
            self.optimize_description(&listing.description, &listing.title),
            self.suggest_keywords(listing),
        );

        let optimized = OptimizedListing {
            title: title.map_err(into_optimization_failure)?,
            bullets: bullets.map_err(into_optimization_failure)?,
            description: description.map_err(into_optimization_failure)?,
            keywords: keywords.map_err(into_optimization_failure)?,
        };

        info!(
            bullets = optimized.bullets.len(),
            keywords = optimized.keywords.len(),
            "AI optimization completed"
        );
        Ok(optimized)
    }

    pub async fn optimize_title(&self, title: &str) -> Result<String, OptimizerError> {
        debug!("Optimizing title");
        let text = self.provider.generate(title_prompt(title), &self.config).await?;
        non_empty_text(text, "title")
    }

    pub async fn optimize_bullets(&self, bullets: &[String]) -> Result<Vec<String>, OptimizerError> {
        if bullets.is_empty() {
            debug!("No bullets to optimize, using placeholder");
            return Ok(vec![BULLETS_PLACEHOLDER.to_string()]);
        }

        debug!(count = bullets.len(), "Optimizing bullet points");
        let text = self
            .provider
            .generate(bullets_prompt(bullets), &self.config)
            .await?;
        Ok(parse_optimized_bullets(&text, self.config.max_list_items))
    }

    pub async fn optimize_description(
        &self,
        description: &str,
        title: &str,
    ) -> Result<String, OptimizerError> {
        debug!("Optimizing description");
        let text = self
            .provider
            .generate(description_prompt(description, title), &self.config)
            .await?;
        non_empty_text(text, "description")
    }

    pub async fn suggest_keywords(
        &self,
        listing: &ProductListing,
    ) -> Result<Vec<String>, OptimizerError> {
        debug!("Generating keyword suggestions");
        let text = self
            .provider
            .generate(keywords_prompt(listing), &self.config)
            .await?;
        Ok(parse_keywords(&text, self.config.max_list_items))
    }
}

fn into_optimization_failure(e: OptimizerError) -> OptimizerError {
    match e {
        OptimizerError::OptimizationFailed(_) => e,
        other => {
            other.log();
            OptimizerError::OptimizationFailed(other.to_string())
        }
    }
}

fn non_empty_text(text: String, field: &str) -> Result<String, OptimizerError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(OptimizerError::OptimizationFailed(format!(
            "model returned an empty {field}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Parse a bullet rewrite: an embedded JSON array if there is one, numbered lines otherwise.
pub fn parse_optimized_bullets(text: &str, max_items: usize) -> Vec<String> {
    parse_string_list(text, &BULLET_MARKER, max_items)
}

/// Parse keyword suggestions: an embedded JSON array if there is one, list lines otherwise.
pub fn parse_keywords(text: &str, max_items: usize) -> Vec<String> {
    parse_string_list(text, &KEYWORD_MARKER, max_items)
}

fn parse_string_list(text: &str, marker: &Regex, max_items: usize) -> Vec<String> {
    let text = text.trim();

    if let Some(items) = embedded_json_array(text) {
        return items;
    }

    warn!("Model reply had no JSON array, using line fallback");
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| marker.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(max_items)
        .collect()
}

/// Greedy bracket match: from the first `[` to the last `]`.
fn embedded_json_array(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if start > end {
        return None;
    }

    match serde_json::from_str::<Vec<String>>(&text[start..=end]) {
        Ok(items) => Some(items.into_iter().map(|s| s.trim().to_string()).collect()),
        Err(e) => {
            debug!(error = %e, "Bracketed span is not a JSON string array");
            None
        }
    }
}

fn title_prompt(title: &str) -> String {
    format!(
        "You are an Amazon listing optimization expert focused on search ranking and conversion.\n\n\
        Current product title:\n\"{title}\"\n\n\
        Write an improved product title that:\n\
        - reads naturally while carrying the most relevant keywords\n\
        - stays under 200 characters\n\
        - names the main benefit and the key features\n\
        - follows Amazon title rules (no promotional phrases, standard capitalization)\n\n\
        Reply with the new title only."
    )
}

fn bullets_prompt(bullets: &[String]) -> String {
    let numbered = bullets
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{}. {}", i + 1, b))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an Amazon listing optimization expert focused on persuasive copy.\n\n\
        Current bullet points:\n{numbered}\n\n\
        Rewrite them so that each one:\n\
        - leads with the customer benefit, then the feature\n\
        - is short and easy to scan, under 250 characters\n\
        - uses active verbs and stays factually accurate\n\
        - avoids claims Amazon disallows such as \"best\" or \"perfect\"\n\n\
        Reply with a JSON array of exactly 5 strings, for example:\n\
        [\"bullet 1\", \"bullet 2\", \"bullet 3\", \"bullet 4\", \"bullet 5\"]\n\
        Reply with the JSON array only."
    )
}

fn description_prompt(description: &str, title: &str) -> String {
    format!(
        "You are an Amazon listing optimization expert focused on product descriptions.\n\n\
        Product title: {title}\n\n\
        Current description:\n{description}\n\n\
        Rewrite the description so it is:\n\
        - engaging and persuasive\n\
        - split into clear paragraphs\n\
        - focused on how the product improves the customer's day\n\
        - compliant with Amazon policy (no promotions, external links or seller details)\n\
        - roughly 250 to 300 words\n\n\
        Reply with the new description only."
    )
}

fn keywords_prompt(listing: &ProductListing) -> String {
    format!(
        "You are an Amazon SEO specialist doing keyword research.\n\n\
        Product listing:\n\
        Title: {}\n\
        Bullets: {}\n\
        Description: {}\n\n\
        Suggest 3 to 5 keywords that:\n\
        - are not already prominent in the listing\n\
        - carry strong purchase intent\n\
        - fit the product category and are real customer search terms\n\n\
        Reply with a JSON array of strings, for example:\n\
        [\"keyword 1\", \"keyword 2\", \"keyword 3\"]\n\
        Reply with the JSON array only.",
        listing.title,
        listing.bullets.join(", "),
        truncate_str(&listing.description, KEYWORD_CONTEXT_WIDTH),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LLMOptimizerConfig::default();
        assert_eq!(config.max_list_items, 5);
        assert_eq!(config.max_output_tokens, 1024);
    }

    #[test]
    fn test_embedded_array() {
        assert_eq!(
            parse_keywords("Here you go: [\"a\",\"b\",\"c\"]", 5),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_fenced_array() {
        let text = "```json\n[\"one\", \"two\"]\n```";
        assert_eq!(parse_optimized_bullets(text, 5), vec!["one", "two"]);
    }

    #[test]
    fn test_numbered_fallback() {
        assert_eq!(parse_optimized_bullets("1. foo\n2. bar", 5), vec!["foo", "bar"]);
    }

    #[test]
    fn test_fallback_strips_markup_and_truncates() {
        let text = "- one\n* two\n\n3) three\n• four\n5. five\n6. six";
        assert_eq!(
            parse_optimized_bullets(text, 5),
            vec!["one", "two", "three", "four", "five"]
        );
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(
            parse_keywords("1. usb lamp\n- desk light\n*. reading lamp", 5),
            vec!["usb lamp", "desk light", "reading lamp"]
        );
    }

    #[test]
    fn test_invalid_bracket_span_falls_back() {
        assert_eq!(
            parse_keywords("[not json]\nsecond line", 5),
            vec!["[not json]", "second line"]
        );
    }

    #[test]
    fn test_prompts_carry_listing() {
        let listing = ProductListing {
            title: "Widget".into(),
            bullets: vec!["Small".into(), "Blue".into()],
            description: "d".repeat(500),
        };
        let prompt = keywords_prompt(&listing);
        assert!(prompt.contains("Title: Widget"));
        assert!(prompt.contains("Bullets: Small, Blue"));
        assert!(!prompt.contains(&"d".repeat(201)));

        assert!(bullets_prompt(&listing.bullets).contains("1. Small\n2. Blue"));
        assert!(description_prompt("text", "Widget").contains("Product title: Widget"));
    }
}
