//! Repository Module
//!
//! Data access layer for the orchestrator. Each repository is a trait with a
//! Postgres implementation and an in-memory implementation; the latter backs
//! tests and database-less deployments.

pub mod job;
pub mod quota;

use thiserror::Error;

pub use job::{InMemoryJobRepository, JobRepository, PgJobRepository};
pub use quota::{DebitOutcome, InMemoryQuotaRepository, PgQuotaRepository, QuotaRepository};

/// Storage failure
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode record: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}
