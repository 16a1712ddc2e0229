//! Fetcher against a local marketplace stand-in

#![cfg(feature = "server")]

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use listing_optimizer::{Asin, Fetcher, FetcherConfig, OptimizerError};
use std::time::Duration;
use tokio::net::TcpListener;

async fn product(Path(asin): Path<String>, headers: HeaderMap) -> Response {
    match asin.as_str() {
        "B000000404" => (StatusCode::NOT_FOUND, "Page Not Found").into_response(),
        "B000000403" => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        "B000000503" => (StatusCode::SERVICE_UNAVAILABLE, "Robot check").into_response(),
        "B000000301" => Redirect::temporary("/hop/1").into_response(),
        "B000000408" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Html("<html>late</html>").into_response()
        }
        _ => {
            let mode = headers
                .get("sec-fetch-mode")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("missing");
            Html(format!(
                r#"<html><body><span id="productTitle">{asin}</span><i id="mode">{mode}</i></body></html>"#
            ))
            .into_response()
        }
    }
}

async fn hop(Path(n): Path<u32>) -> Redirect {
    Redirect::temporary(&format!("/hop/{}", n + 1))
}

async fn marketplace() -> String {
    let app = Router::new()
        .route("/dp/:asin", get(product))
        .route("/hop/:n", get(hop));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn fetcher() -> Fetcher {
    Fetcher::new_with_config(FetcherConfig {
        base_url: Some(marketplace().await),
        timeout: Duration::from_millis(500),
        ..FetcherConfig::default()
    })
    .unwrap()
}

fn asin(raw: &str) -> Asin {
    Asin::parse(raw).unwrap()
}

#[tokio::test]
async fn test_fetch_returns_body_with_browser_headers() {
    let fetcher = fetcher().await;

    let body = fetcher.fetch(&asin("B08N5WRWNW")).await.unwrap();
    assert!(body.contains(r#"<span id="productTitle">B08N5WRWNW</span>"#));
    assert!(body.contains(r#"<i id="mode">navigate</i>"#));
}

#[tokio::test]
async fn test_missing_page_is_fetch_failure() {
    let fetcher = fetcher().await;

    let result = fetcher.fetch(&asin("B000000404")).await;
    assert!(matches!(result, Err(OptimizerError::FetchFailed(_))));
}

#[tokio::test]
async fn test_blocked_page_is_inaccessible() {
    let fetcher = fetcher().await;

    for raw in ["B000000403", "B000000503"] {
        let result = fetcher.fetch(&asin(raw)).await;
        assert!(
            matches!(result, Err(OptimizerError::ProductInaccessible(_))),
            "{raw}"
        );
    }
}

#[tokio::test]
async fn test_redirect_chain_is_bounded() {
    let fetcher = fetcher().await;

    let result = fetcher.fetch(&asin("B000000301")).await;
    assert!(matches!(result, Err(OptimizerError::FetchFailed(_))));
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let fetcher = fetcher().await;

    match fetcher.fetch(&asin("B000000408")).await {
        Err(OptimizerError::FetchFailed(message)) => assert!(message.contains("timed out")),
        other => panic!("expected a timeout, got {other:?}"),
    }
}
