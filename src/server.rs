//! JSON HTTP API over [`OptimizationService`]
//!
//! Every response uses the `{success, data}` / `{success: false, error}` envelope.

use crate::{
    OptimizationRecord, OptimizationResult, OptimizationService, OptimizationSummary,
    OptimizerError,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, warn};

const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OptimizationService>,
}

impl AppState {
    pub fn new(service: OptimizationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn success<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
}

/// Error response: status code plus a message that is safe to show users
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<OptimizerError> for ApiError {
    fn from(e: OptimizerError) -> Self {
        e.log();
        match e {
            OptimizerError::InvalidAsin(_) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            OptimizerError::ProductNotFound(_) => Self::new(
                StatusCode::NOT_FOUND,
                "Product not found. Please check the ASIN and try again.",
            ),
            OptimizerError::ProductInaccessible(_) => Self::new(
                StatusCode::FORBIDDEN,
                "Product not accessible on the marketplace",
            ),
            OptimizerError::StorageUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Database connection failed")
            }
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred. Please try again.",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    asin: Option<String>,
}

/// Raw query values, parsed leniently so junk falls back to the defaults
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    limit: Option<String>,
    offset: Option<String>,
}

impl HistoryQuery {
    fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    fn offset(&self) -> u32 {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/optimize", post(optimize_handler))
        .route("/history", get(history_handler))
        .route("/history/asin/:asin", get(history_by_asin_handler))
        .route("/history/:id", get(optimization_by_id_handler));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api", api)
        .fallback(not_found_handler)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Amazon Listing Optimizer API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found_handler() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found")
}

/// POST /api/optimize
///
/// # Errors
/// - 400 Bad Request: missing or malformed ASIN
/// - 404 Not Found: the page was fetched but carries no listing
/// - 403 Forbidden: the marketplace blocked the request
/// - 503 Service Unavailable: database unreachable
/// - 500 Internal Server Error: anything else
async fn optimize_handler(
    State(state): State<AppState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OptimizationResult>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected optimize request body");
        ApiError::new(StatusCode::BAD_REQUEST, "Request body must be JSON with an asin field")
    })?;

    let asin = match request.asin {
        Some(asin) if !asin.is_empty() => asin,
        _ => {
            warn!("Validation failed: ASIN is required");
            return Err(ApiError::new(StatusCode::BAD_REQUEST, "ASIN is required"));
        }
    };

    let result = state.service.optimize(&asin).await?;
    #[cfg(feature = "logging")]
    crate::log_optimization_card(&result);
    Ok(success(result))
}

/// GET /api/history?limit&offset
async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<OptimizationSummary>>>, ApiError> {
    let history = state
        .service
        .store()
        .list_all(query.limit(), query.offset())
        .await?;
    Ok(success(history))
}

/// GET /api/history/asin/:asin
async fn history_by_asin_handler(
    State(state): State<AppState>,
    Path(asin): Path<String>,
) -> Result<Json<ApiResponse<Vec<OptimizationSummary>>>, ApiError> {
    let history = state.service.store().list_by_asin(&asin).await?;
    Ok(success(history))
}

/// GET /api/history/:id
async fn optimization_by_id_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OptimizationRecord>>, ApiError> {
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, "Optimization not found");

    let id: i64 = id.parse().map_err(|_| not_found())?;
    let record = state.service.store().get_by_id(id).await?.ok_or_else(not_found)?;
    Ok(success(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>, offset: Option<&str>) -> HistoryQuery {
        HistoryQuery {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
        }
    }

    #[test]
    fn test_history_query_defaults() {
        let q = query(None, None);
        assert_eq!((q.limit(), q.offset()), (10, 0));

        let q = query(Some("abc"), Some("-3"));
        assert_eq!((q.limit(), q.offset()), (10, 0));

        let q = query(Some("0"), Some("20"));
        assert_eq!((q.limit(), q.offset()), (10, 20));

        let q = query(Some(" 25 "), Some("5"));
        assert_eq!((q.limit(), q.offset()), (25, 5));
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (OptimizerError::InvalidAsin("x".into()), StatusCode::BAD_REQUEST),
            (OptimizerError::ProductNotFound("x".into()), StatusCode::NOT_FOUND),
            (OptimizerError::ProductInaccessible("x".into()), StatusCode::FORBIDDEN),
            (
                OptimizerError::StorageUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                OptimizerError::OptimizationFailed("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (OptimizerError::Unexpected("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let api_error = ApiError::from(OptimizerError::StorageError("disk I/O at /var/db".into()));
        assert!(!api_error.message.contains("/var/db"));
    }
}
