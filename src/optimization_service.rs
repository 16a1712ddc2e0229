use crate::{
    Asin, ListingExtractor, ListingOptimizer, NewOptimization, OptimizationResult,
    OptimizationStore, OptimizerError, PageSource,
};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// OptimizationService runs the whole optimize-by-ASIN pipeline:
/// validate, fetch, extract, optimize, persist.
///
/// Every collaborator is injected, and any stage error is returned unchanged.
#[derive(Clone)]
pub struct OptimizationService {
    pages: Arc<dyn PageSource>,
    extractor: ListingExtractor,
    optimizer: Arc<ListingOptimizer>,
    store: Arc<dyn OptimizationStore>,
}

impl OptimizationService {
    pub fn new(
        pages: Arc<dyn PageSource>,
        optimizer: Arc<ListingOptimizer>,
        store: Arc<dyn OptimizationStore>,
    ) -> Self {
        Self {
            pages,
            extractor: ListingExtractor::new(),
            optimizer,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn OptimizationStore> {
        &self.store
    }

    pub async fn optimize(&self, raw_asin: &str) -> Result<OptimizationResult, OptimizerError> {
        let asin = Asin::parse(raw_asin)?;
        let span = info_span!("optimize", asin = %asin);
        self.run(asin).instrument(span).await
    }

    async fn run(&self, asin: Asin) -> Result<OptimizationResult, OptimizerError> {
        info!("Fetching product page");
        let html = self.pages.fetch_product_page(&asin).await?;

        let original = self.extractor.extract(&html)?;
        info!(
            bullets = original.bullets.len(),
            "Optimizing product listing"
        );

        let optimized = self.optimizer.optimize(&original).await?;

        let new_optimization = NewOptimization {
            asin,
            original,
            optimized,
        };
        let id = self.store.save(&new_optimization).await?;
        info!(id, "Optimization saved");

        let NewOptimization {
            asin,
            original,
            optimized,
        } = new_optimization;

        Ok(OptimizationResult {
            id,
            asin,
            original,
            optimized,
        })
    }
}
