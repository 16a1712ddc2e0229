//! End-to-end pipeline with a canned page source, mock model and in-memory store

use async_trait::async_trait;
use listing_optimizer::{
    Asin, ListingOptimizer, MigrationRunner, MockProvider, OptimizationService,
    OptimizationStore, OptimizerError, PageSource, SqliteStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const WIDGET_PAGE: &str = r#"<html><body>
    <span id="productTitle">Widget</span>
    <h1>About this item</h1>
    <ul>
        <li><span class="a-list-item">Durable</span></li>
        <li><span class="a-list-item">Small</span></li>
    </ul>
    <h2>Product description</h2>
    <div><p>Great widget</p></div>
</body></html>"#;

struct FakePages {
    html: Result<String, fn() -> OptimizerError>,
    fetches: AtomicUsize,
}

impl FakePages {
    fn serving(html: &str) -> Self {
        Self {
            html: Ok(html.to_string()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn failing(error: fn() -> OptimizerError) -> Self {
        Self {
            html: Err(error),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FakePages {
    async fn fetch_product_page(&self, _asin: &Asin) -> Result<String, OptimizerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.html {
            Ok(html) => Ok(html.clone()),
            Err(error) => Err(error()),
        }
    }
}

async fn service_with(pages: Arc<FakePages>, provider: Arc<MockProvider>) -> OptimizationService {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    MigrationRunner::new(store.pool().clone())
        .run_pending()
        .await
        .unwrap();

    OptimizationService::new(
        pages,
        Arc::new(ListingOptimizer::new(provider)),
        Arc::new(store),
    )
}

fn widget_provider() -> MockProvider {
    MockProvider::new()
        .with_response("Current product title:", "Widget Pro")
        .with_response("Current bullet points:", r#"["Lasts for years", "Fits anywhere"]"#)
        .with_response("Current description:", "A great widget, improved.")
        .with_response("keyword research", r#"["steel widget", "pocket widget"]"#)
}

#[tokio::test]
async fn test_optimize_end_to_end() {
    let pages = Arc::new(FakePages::serving(WIDGET_PAGE));
    let service = service_with(pages.clone(), Arc::new(widget_provider())).await;

    let result = service.optimize("B08N5WRWNW").await.unwrap();

    assert!(result.id > 0);
    assert_eq!(result.asin.as_str(), "B08N5WRWNW");
    assert_eq!(result.original.title, "Widget");
    assert_eq!(result.original.bullets, vec!["Durable", "Small"]);
    assert_eq!(result.original.description, "Great widget");
    assert_eq!(result.optimized.title, "Widget Pro");
    assert_eq!(result.optimized.keywords, vec!["steel widget", "pocket widget"]);
    assert_eq!(pages.fetches(), 1);

    let stored = service.store().get_by_id(result.id).await.unwrap().unwrap();
    assert_eq!(stored.original, result.original);
    assert_eq!(stored.optimized, result.optimized);
}

#[tokio::test]
async fn test_invalid_asin_never_fetches() {
    let pages = Arc::new(FakePages::serving(WIDGET_PAGE));
    let provider = Arc::new(widget_provider());
    let service = service_with(pages.clone(), provider.clone()).await;

    for raw in ["", "b08n5wrwnw", "B08N5WRWN", "B08N5WRWNW1"] {
        let result = service.optimize(raw).await;
        assert!(matches!(result, Err(OptimizerError::InvalidAsin(_))));
    }
    assert_eq!(pages.fetches(), 0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_fetch_errors_pass_through() {
    let pages = Arc::new(FakePages::failing(|| {
        OptimizerError::ProductNotFound("status 404".to_string())
    }));
    let provider = Arc::new(widget_provider());
    let service = service_with(pages, provider.clone()).await;

    let result = service.optimize("B08N5WRWNW").await;
    assert!(matches!(result, Err(OptimizerError::ProductNotFound(_))));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_failed_optimization_is_not_saved() {
    let pages = Arc::new(FakePages::serving(WIDGET_PAGE));
    let provider = Arc::new(MockProvider::new().with_failure("Current description:", "boom"));
    let service = service_with(pages, provider).await;

    let result = service.optimize("B08N5WRWNW").await;
    assert!(matches!(result, Err(OptimizerError::OptimizationFailed(_))));
    assert!(service.store().list_all(10, 0).await.unwrap().is_empty());
}
