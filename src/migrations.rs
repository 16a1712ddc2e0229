//! Schema migrations with an append-only ledger
//!
//! Each migration is applied inside its own transaction together with its ledger row,
//! so running the runner again only touches migrations that are not yet recorded.

use crate::OptimizerError;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Ordering key and ledger entry, e.g. `001_create_optimizations`
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_create_optimizations",
    up: include_str!("../migrations/001_create_optimizations/up.sql"),
    down: include_str!("../migrations/001_create_optimizations/down.sql"),
}];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
}

pub struct MigrationRunner {
    pool: SqlitePool,
    migrations: &'static [Migration],
}

impl MigrationRunner {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_migrations(pool, MIGRATIONS)
    }

    pub fn with_migrations(pool: SqlitePool, migrations: &'static [Migration]) -> Self {
        Self { pool, migrations }
    }

    async fn ensure_ledger(&self) -> Result<(), OptimizerError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                applied_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Ledger entries in the order they were applied
    pub async fn applied(&self) -> Result<Vec<String>, OptimizerError> {
        self.ensure_ledger().await?;

        let rows = sqlx::query("SELECT name FROM schema_migrations ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    pub async fn pending(&self) -> Result<Vec<Migration>, OptimizerError> {
        let applied = self.applied().await?;
        let mut pending: Vec<Migration> = self
            .migrations
            .iter()
            .filter(|m| !applied.iter().any(|name| name == m.name))
            .copied()
            .collect();
        pending.sort_by_key(|m| m.name);
        Ok(pending)
    }

    /// Apply every pending migration, returning the names applied
    #[instrument(level = "debug", skip(self), err)]
    pub async fn run_pending(&self) -> Result<Vec<String>, OptimizerError> {
        let pending = self.pending().await?;
        if pending.is_empty() {
            info!("No pending migrations");
            return Ok(Vec::new());
        }

        let mut applied = Vec::with_capacity(pending.len());
        for migration in pending {
            info!(migration = migration.name, "Applying migration");

            let mut tx = self.pool.begin().await?;
            for statement in statements(migration.up) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query("INSERT INTO schema_migrations (name) VALUES (?)")
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            applied.push(migration.name.to_string());
        }

        info!(count = applied.len(), "Migrations applied");
        Ok(applied)
    }

    /// Revert the most recent `steps` migrations, newest first
    #[instrument(level = "debug", skip(self), err)]
    pub async fn rollback(&self, steps: usize) -> Result<Vec<String>, OptimizerError> {
        let applied = self.applied().await?;
        let mut reverted = Vec::new();

        for name in applied.iter().rev().take(steps) {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.name == name.as_str())
                .ok_or_else(|| {
                    OptimizerError::StorageError(format!("no down script for migration {name}"))
                })?;

            info!(migration = migration.name, "Rolling back migration");

            let mut tx = self.pool.begin().await?;
            for statement in statements(migration.down) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query("DELETE FROM schema_migrations WHERE name = ?")
                .bind(migration.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            reverted.push(name.clone());
        }

        Ok(reverted)
    }

    pub async fn status(&self) -> Result<MigrationStatus, OptimizerError> {
        Ok(MigrationStatus {
            applied: self.applied().await?,
            pending: self
                .pending()
                .await?
                .into_iter()
                .map(|m| m.name.to_string())
                .collect(),
        })
    }
}

/// Split a script on `;`. Scripts must not contain triggers or string literals with `;`.
fn statements(script: &str) -> impl Iterator<Item = &str> {
    script
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}
