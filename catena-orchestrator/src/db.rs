use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            kind VARCHAR(20) NOT NULL,
            name TEXT NOT NULL,
            status VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            progress_total BIGINT NOT NULL DEFAULT 0,
            progress_completed BIGINT NOT NULL DEFAULT 0,
            result JSONB NOT NULL DEFAULT '[]',
            message TEXT,
            owner VARCHAR(255) NOT NULL,
            app_id TEXT,
            file_id TEXT,
            published BOOLEAN NOT NULL DEFAULT FALSE,
            deleted_at TIMESTAMPTZ,
            embedding JSONB
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_owner ON jobs(owner, created_at DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_published ON jobs(published) WHERE published")
        .execute(pool)
        .await?;

    // Create quota ledger table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_quotas (
            user_id VARCHAR(255) PRIMARY KEY,
            quota_available BIGINT NOT NULL CHECK (quota_available >= 0),
            quota_used BIGINT NOT NULL DEFAULT 0,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
