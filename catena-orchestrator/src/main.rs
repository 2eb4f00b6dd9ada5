//! Catena Orchestrator
//!
//! HTTP service that runs LLM pipelines synchronously and as background
//! batch or embedding jobs, with per-user quota admission and cooperative
//! cancellation.
//!
//! Architecture:
//! - Configuration: environment variables with defaults
//! - Repositories: job records and quota ledgers (Postgres or in-memory)
//! - Services: admission control and the job lifecycle
//! - Scheduler: bounded worker pool executing accepted jobs

mod api;
mod config;
mod db;
mod repository;
mod scheduler;
mod service;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use catena_runner::provider::StandardProviders;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{
    InMemoryJobRepository, InMemoryQuotaRepository, JobRepository, PgJobRepository,
    PgQuotaRepository, QuotaRepository,
};
use crate::service::JobService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catena_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Catena Orchestrator...");

    let config = load_config()?;
    info!(
        "Loaded configuration: bind_addr={}, max_workers={}, platform_keys={:?}",
        config.bind_addr, config.max_workers, config.platform_keys
    );

    let (jobs, quotas) = open_stores(&config).await?;

    let providers = Arc::new(StandardProviders::new(config.providers.clone()));
    let service = Arc::new(JobService::new(
        jobs,
        quotas,
        config.quota.clone(),
        providers,
        config.max_workers,
        config.platform_keys.clone(),
    ));

    // Build router with all API endpoints
    let app = api::create_router(service);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    let config = Config::from_env();
    config.validate()?;
    Ok(config)
}

/// Postgres-backed stores when DATABASE_URL is set, in-memory otherwise
async fn open_stores(
    config: &Config,
) -> Result<(Arc<dyn JobRepository>, Arc<dyn QuotaRepository>)> {
    let Some(database_url) = &config.database_url else {
        info!("DATABASE_URL not set, using in-memory stores");
        return Ok((
            Arc::new(InMemoryJobRepository::new()),
            Arc::new(InMemoryQuotaRepository::new()),
        ));
    };

    info!("Connecting to database...");

    let pool = db::create_pool(database_url)
        .await
        .context("Failed to create database pool")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database ready");
    warn!("Vector collections are held in memory; embeddings built before a restart must be rebuilt");

    Ok((
        Arc::new(PgJobRepository::new(pool.clone())),
        Arc::new(PgQuotaRepository::new(pool)),
    ))
}
