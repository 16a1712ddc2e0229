use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listing_optimizer::{
    log_error_card, log_optimization_card, serve, setup_logging, AppConfig, AppState, Fetcher,
    LLMConfig, ListingOptimizer, LogConfig, MigrationRunner, OptimizationService, SqliteStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Amazon listing optimizer
#[derive(Parser, Debug)]
#[command(name = "listing-optimizer")]
#[command(version)]
#[command(about = "Rewrite Amazon product listings with an LLM and keep the history", long_about = None)]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations, then run the HTTP API
    Serve {
        /// Overrides PORT
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Manage the database schema
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Optimize a single ASIN and print the result as JSON
    Optimize {
        /// Ten-character Amazon Standard Identification Number
        asin: String,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateAction {
    /// Apply every pending migration
    Up,
    /// Revert the most recent migrations
    Down {
        #[arg(default_value_t = 1)]
        steps: usize,
    },
    /// List applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(database_url) = cli.database_url {
        config.database_url = database_url;
    }

    setup_logging(LogConfig {
        log_dir: config.log_dir.clone(),
        log_level: config.log_level.clone(),
        console_output: true,
        file_output: config.log_to_file,
    })?;

    let store = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("connecting to {}", config.database_url))?;
    let migrations = MigrationRunner::new(store.pool().clone());

    match cli.command {
        Commands::Serve { port } => {
            migrations.run_pending().await?;

            let service = build_service(&config, store)?;
            let addr: SocketAddr = format!("{}:{}", config.host, port.unwrap_or(config.port))
                .parse()
                .context("invalid HOST/PORT")?;

            serve(addr, AppState::new(service)).await?;
        }
        Commands::Migrate { action } => match action {
            MigrateAction::Up => {
                let applied = migrations.run_pending().await?;
                info!(?applied, "Migrate up finished");
            }
            MigrateAction::Down { steps } => {
                let reverted = migrations.rollback(steps).await?;
                info!(?reverted, "Migrate down finished");
            }
            MigrateAction::Status => {
                let status = migrations.status().await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        },
        Commands::Optimize { asin } => {
            migrations.run_pending().await?;

            let service = build_service(&config, store)?;
            match service.optimize(&asin).await {
                Ok(result) => {
                    log_optimization_card(&result);
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                Err(e) => {
                    log_error_card(&asin, &e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

fn build_service(config: &AppConfig, store: SqliteStore) -> Result<OptimizationService> {
    let fetcher = Fetcher::new_with_config(config.fetcher_config())?;
    let provider = LLMConfig::from_env()?;
    let optimizer = ListingOptimizer::new(provider);
    info!(provider = optimizer.provider_name(), "LLM provider selected");

    Ok(OptimizationService::new(
        Arc::new(fetcher),
        Arc::new(optimizer),
        Arc::new(store),
    ))
}
