use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Invalid ASIN format. Must be 10 alphanumeric characters: {0}")]
    InvalidAsin(String),

    #[error("Failed to build product URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch product page: {0}")]
    FetchFailed(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product not accessible: {0}")]
    ProductInaccessible(String),

    #[error("Failed to optimize product listing: {0}")]
    OptimizationFailed(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// SQLite primary result codes that mean the database cannot be reached right now:
/// BUSY, LOCKED, READONLY, IOERR, CANTOPEN.
const SQLITE_UNAVAILABLE_CODES: [i32; 5] = [5, 6, 8, 10, 14];

impl From<sqlx::Error> for OptimizerError {
    fn from(e: sqlx::Error) -> Self {
        let unavailable = match &e {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => is_unavailable_code(db.code().as_deref()),
            _ => false,
        };

        if unavailable {
            OptimizerError::StorageUnavailable(e.to_string())
        } else {
            OptimizerError::StorageError(e.to_string())
        }
    }
}

/// Extended result codes carry the primary code in their low byte.
fn is_unavailable_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| SQLITE_UNAVAILABLE_CODES.contains(&(c & 0xff)))
}

impl OptimizerError {
    /// True for failures caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OptimizerError::InvalidAsin(_)
                | OptimizerError::ProductNotFound(_)
                | OptimizerError::ProductInaccessible(_)
        )
    }

    pub fn log(&self) {
        match self {
            OptimizerError::InvalidAsin(asin) => {
                warn!(asin = %asin, "Rejected malformed ASIN");
            }
            OptimizerError::UrlParseError(e) => {
                error!(error = %e, "Product URL could not be built");
            }
            OptimizerError::FetchFailed(e) => {
                error!(error = %e, "Product page fetch failed");
            }
            OptimizerError::ProductNotFound(e) => {
                warn!(error = %e, "Product not found");
            }
            OptimizerError::ProductInaccessible(e) => {
                warn!(error = %e, "Product page blocked or inaccessible");
            }
            OptimizerError::OptimizationFailed(e) => {
                error!(error = %e, "AI optimization failed");
            }
            OptimizerError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
            OptimizerError::ParseError(e) => {
                warn!(error = %e, "JSON parsing failed");
            }
            OptimizerError::StorageUnavailable(e) => {
                error!(error = %e, "Storage unreachable");
            }
            OptimizerError::StorageError(e) => {
                error!(error = %e, "Storage operation failed");
            }
            OptimizerError::InvalidConfiguration(e) => {
                error!(error = %e, "Invalid configuration");
            }
            OptimizerError::Unexpected(e) => {
                error!(error = %e, "Unexpected failure");
            }
        }
    }
}
