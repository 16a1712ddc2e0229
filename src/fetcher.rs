use crate::{Asin, OptimizerError, PageSource};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/131.0.0.0 Safari/537.36";

/// Fetcher configuration.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     domain: "amazon.com".to_string(),
///     ..FetcherConfig::default()
/// })?;
/// ```
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Marketplace host without the `www.` prefix, e.g. `amazon.in`
    pub domain: String,
    /// Replaces `https://www.{domain}` as the URL prefix, e.g. for a local mirror
    pub base_url: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            domain: "amazon.in".to_string(),
            base_url: None,
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
            max_redirects: 5,
        }
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
}

impl Fetcher {
    pub fn new() -> Result<Self, OptimizerError> {
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, OptimizerError> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .default_headers(browser_headers())
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create HTTP client");
                OptimizerError::InvalidConfiguration(format!("HTTP client: {e}"))
            })?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| marketplace_url(&config.domain));

        debug!(base_url = %base_url, "Fetcher initialized");
        Ok(Self { client, base_url })
    }

    pub fn with_client(client: Client, domain: &str) -> Self {
        Self {
            client,
            base_url: marketplace_url(domain),
        }
    }

    pub fn product_url(&self, asin: &Asin) -> Result<Url, OptimizerError> {
        Ok(Url::parse(&format!(
            "{}/dp/{}",
            self.base_url.trim_end_matches('/'),
            asin
        ))?)
    }

    #[instrument(level = "debug", skip(self), fields(asin = %asin), err)]
    pub async fn fetch(&self, asin: &Asin) -> Result<String, OptimizerError> {
        let url = self.product_url(asin)?;
        debug!(url = %url, "Requesting product page");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to send request");
            if e.is_timeout() {
                OptimizerError::FetchFailed(format!("request timed out: {e}"))
            } else {
                OptimizerError::FetchFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Product page returned non-success status");
            return Err(classify_status(status, asin));
        }

        let body = response.text().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            OptimizerError::FetchFailed(e.to_string())
        })?;

        debug!(url = %url, content_length = body.len(), "Fetched product page");
        Ok(body)
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch_product_page(&self, asin: &Asin) -> Result<String, OptimizerError> {
        self.fetch(asin).await
    }
}

fn marketplace_url(domain: &str) -> String {
    format!("https://www.{domain}")
}

/// 403 and the 503 bot wall mean the marketplace refused us; any other status is a failed fetch.
fn classify_status(status: StatusCode, asin: &Asin) -> OptimizerError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE => {
            OptimizerError::ProductInaccessible(format!("marketplace returned {status}"))
        }
        _ => OptimizerError::FetchFailed(format!("marketplace returned {status} for {asin}")),
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let pairs = [
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("accept-language", "en-US,en;q=0.9"),
        ("dnt", "1"),
        ("upgrade-insecure-requests", "1"),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("cache-control", "max-age=0"),
    ];

    for (name, value) in pairs {
        if let Ok(value) = value.parse() {
            headers.insert(name, value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_url() {
        let fetcher = Fetcher::new().unwrap();
        let asin = Asin::parse("B08N5WRWNW").unwrap();
        assert_eq!(
            fetcher.product_url(&asin).unwrap().as_str(),
            "https://www.amazon.in/dp/B08N5WRWNW"
        );
    }

    #[test]
    fn test_base_url_override() {
        let fetcher = Fetcher::new_with_config(FetcherConfig {
            base_url: Some("http://127.0.0.1:8080/".to_string()),
            ..FetcherConfig::default()
        })
        .unwrap();
        let asin = Asin::parse("B08N5WRWNW").unwrap();
        assert_eq!(
            fetcher.product_url(&asin).unwrap().as_str(),
            "http://127.0.0.1:8080/dp/B08N5WRWNW"
        );
    }

    #[test]
    fn test_bad_domain_is_url_error() {
        let fetcher = Fetcher::with_client(Client::new(), "bad domain");
        let asin = Asin::parse("B08N5WRWNW").unwrap();
        assert!(matches!(
            fetcher.product_url(&asin),
            Err(OptimizerError::UrlParseError(_))
        ));
    }

    #[test]
    fn test_classify_status() {
        let asin = Asin::parse("B08N5WRWNW").unwrap();
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, &asin),
            OptimizerError::FetchFailed(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, &asin),
            OptimizerError::ProductInaccessible(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, &asin),
            OptimizerError::ProductInaccessible(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, &asin),
            OptimizerError::FetchFailed(_)
        ));
    }

    #[test]
    fn test_browser_headers() {
        let headers = browser_headers();
        assert_eq!(headers.len(), 8);
        assert_eq!(headers["sec-fetch-mode"], "navigate");
    }
}
