use crate::{FetcherConfig, OptimizerError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service settings read from the environment (a `.env` file is loaded by the binary).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub amazon_domain: String,
    pub fetch_timeout: Duration,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: "sqlite://listing-optimizer.db".to_string(),
            amazon_domain: "amazon.in".to_string(),
            fetch_timeout: Duration::from_secs(15),
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            log_to_file: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, OptimizerError> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            amazon_domain: env::var("AMAZON_DOMAIN").unwrap_or(defaults.amazon_domain),
            fetch_timeout: Duration::from_secs(parse_var(
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            log_to_file: parse_var("LOG_TO_FILE", defaults.log_to_file)?,
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            domain: self.amazon_domain.clone(),
            timeout: self.fetch_timeout,
            ..FetcherConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, OptimizerError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            OptimizerError::InvalidConfiguration(format!("{name} has an invalid value: {raw:?}"))
        }),
        Err(_) => Ok(default),
    }
}
