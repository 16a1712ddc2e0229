//! Optimization history store
//!
//! The pipeline only needs [`OptimizationStore`]; [`SqliteStore`] is the sqlx-backed
//! implementation used by the service.

use crate::{Asin, OptimizedListing, OptimizerError, ProductListing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Input for [`OptimizationStore::save`]
#[derive(Debug, Clone)]
pub struct NewOptimization {
    pub asin: Asin,
    pub original: ProductListing,
    pub optimized: OptimizedListing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRecord {
    pub id: i64,
    pub asin: Asin,
    pub original: ProductListing,
    pub optimized: OptimizedListing,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryListing {
    pub title: String,
}

/// List-view row: title only, full detail is fetched by id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSummary {
    pub id: i64,
    pub asin: Asin,
    pub original: SummaryListing,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait OptimizationStore: Send + Sync {
    /// Insert an immutable record and return its generated id
    async fn save(&self, optimization: &NewOptimization) -> Result<i64, OptimizerError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<OptimizationRecord>, OptimizerError>;

    /// Summaries for one ASIN, newest first
    async fn list_by_asin(&self, asin: &str) -> Result<Vec<OptimizationSummary>, OptimizerError>;

    /// Summaries for all ASINs, ascending by id
    async fn list_all(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<OptimizationSummary>, OptimizerError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url`.
    ///
    /// In-memory databases live only as long as their connection, so they get a single
    /// connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, OptimizerError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        debug!(url = %url, in_memory, "Connected to SQLite");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl OptimizationStore for SqliteStore {
    #[instrument(level = "debug", skip_all, fields(asin = %optimization.asin), err)]
    async fn save(&self, optimization: &NewOptimization) -> Result<i64, OptimizerError> {
        let NewOptimization {
            asin,
            original,
            optimized,
        } = optimization;

        let result = sqlx::query(
            r"
            INSERT INTO optimizations (
                asin,
                original_title,
                original_bullets,
                original_description,
                optimized_title,
                optimized_bullets,
                optimized_description,
                suggested_keywords,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(asin.as_str())
        .bind(&original.title)
        .bind(serde_json::to_string(&original.bullets)?)
        .bind(&original.description)
        .bind(&optimized.title)
        .bind(serde_json::to_string(&optimized.bullets)?)
        .bind(&optimized.description)
        .bind(serde_json::to_string(&optimized.keywords)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, "Optimization saved");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<OptimizationRecord>, OptimizerError> {
        let row = sqlx::query(
            r"
            SELECT id, asin, original_title, original_bullets, original_description,
                   optimized_title, optimized_bullets, optimized_description,
                   suggested_keywords, created_at
            FROM optimizations
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn list_by_asin(&self, asin: &str) -> Result<Vec<OptimizationSummary>, OptimizerError> {
        let rows = sqlx::query(
            r"
            SELECT id, asin, original_title, created_at
            FROM optimizations
            WHERE asin = ?
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(asin)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn list_all(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<OptimizationSummary>, OptimizerError> {
        let rows = sqlx::query(
            r"
            SELECT id, asin, original_title, created_at
            FROM optimizations
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            ",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<OptimizationRecord, OptimizerError> {
    Ok(OptimizationRecord {
        id: row.try_get("id")?,
        asin: stored_asin(row)?,
        original: ProductListing {
            title: text_column(row, "original_title")?,
            bullets: decode_list(row.try_get("original_bullets")?),
            description: text_column(row, "original_description")?,
        },
        optimized: OptimizedListing {
            title: text_column(row, "optimized_title")?,
            bullets: decode_list(row.try_get("optimized_bullets")?),
            description: text_column(row, "optimized_description")?,
            keywords: decode_list(row.try_get("suggested_keywords")?),
        },
        created_at: row.try_get("created_at")?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<OptimizationSummary, OptimizerError> {
    Ok(OptimizationSummary {
        id: row.try_get("id")?,
        asin: stored_asin(row)?,
        original: SummaryListing {
            title: text_column(row, "original_title")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn stored_asin(row: &SqliteRow) -> Result<Asin, OptimizerError> {
    let raw: String = row.try_get("asin")?;
    Asin::parse(&raw)
        .map_err(|_| OptimizerError::StorageError(format!("stored ASIN is malformed: {raw:?}")))
}

fn text_column(row: &SqliteRow, column: &str) -> Result<String, OptimizerError> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.unwrap_or_default())
}

/// Decode a JSON string-array column. NULL, blank or malformed payloads read as empty.
pub(crate) fn decode_list(raw: Option<String>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, value = %crate::truncate_str(&raw, 80), "Stored list is not a JSON string array");
        Vec::new()
    })
}
