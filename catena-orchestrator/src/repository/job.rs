//! Job Repository
//!
//! Persists job records. After creation a record is written only by the
//! worker that owns the job (progress and terminal updates), except for the
//! owner-driven flags `published` and `deleted_at`.

use async_trait::async_trait;
use catena_core::domain::job::{EmbeddingConfig, Job, JobKind, JobStatus, Progress, SourceRefs};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RepositoryError;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError>;

    /// Records the status, progress and accumulated results of a running job
    async fn update_progress(
        &self,
        id: Uuid,
        status: JobStatus,
        progress: Progress,
        result: &[Value],
    ) -> Result<(), RepositoryError>;

    /// Moves a job to a terminal status, stamping `completed_at`
    async fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Non-deleted jobs owned by `viewer` or published, newest first
    async fn list_visible(
        &self,
        viewer: &str,
        kind: Option<JobKind>,
    ) -> Result<Vec<Job>, RepositoryError>;

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    async fn publish(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

// =============================================================================
// Postgres
// =============================================================================

/// Postgres implementation of JobRepository
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const JOB_COLUMNS: &str = r#"
    id, kind, name, status, created_at, completed_at, progress_total,
    progress_completed, result, message, owner, app_id, file_id, published,
    deleted_at, embedding
"#;

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let embedding = job
            .embedding
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, kind, name, status, created_at, progress_total,
                              progress_completed, result, owner, app_id, file_id,
                              published, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id)
        .bind(job.kind.as_str())
        .bind(&job.name)
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(to_db_count(job.progress.total))
        .bind(to_db_count(job.progress.completed))
        .bind(Value::Array(job.result.clone()))
        .bind(&job.owner)
        .bind(&job.source_refs.app_id)
        .bind(&job.source_refs.file_id)
        .bind(job.published)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn update_progress(
        &self,
        id: Uuid,
        status: JobStatus,
        progress: Progress,
        result: &[Value],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, progress_total = $2, progress_completed = $3, result = $4
            WHERE id = $5
            "#,
        )
        .bind(status.as_str())
        .bind(to_db_count(progress.total))
        .bind(to_db_count(progress.completed))
        .bind(Value::Array(result.to_vec()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, message = COALESCE($2, message), completed_at = $3
            WHERE id = $4
            "#,
        )
        .bind(status.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_visible(
        &self,
        viewer: &str,
        kind: Option<JobKind>,
    ) -> Result<Vec<Job>, RepositoryError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE deleted_at IS NULL
              AND (owner = $1 OR published)
              AND ($2::VARCHAR IS NULL OR kind = $2)
            ORDER BY created_at DESC
            "#,
            JOB_COLUMNS
        ))
        .bind(viewer)
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE jobs SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn publish(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE jobs SET published = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory implementation of JobRepository
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_progress(
        &self,
        id: Uuid,
        status: JobStatus,
        progress: Progress,
        result: &[Value],
    ) -> Result<(), RepositoryError> {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.status = status;
            job.progress = progress;
            job.result = result.to_vec();
        }
        Ok(())
    }

    async fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            job.status = status;
            if let Some(message) = message {
                job.message = Some(message.to_string());
            }
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_visible(
        &self,
        viewer: &str,
        kind: Option<JobKind>,
    ) -> Result<Vec<Job>, RepositoryError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_visible_to(viewer))
            .filter(|job| kind.is_none_or(|k| job.kind == k))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        match self.jobs.write().await.get_mut(&id) {
            Some(job) if job.deleted_at.is_none() => {
                job.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn publish(&self, id: Uuid) -> Result<bool, RepositoryError> {
        match self.jobs.write().await.get_mut(&id) {
            Some(job) => {
                job.published = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn to_db_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn from_db_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or_default()
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    kind: String,
    name: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    progress_total: i64,
    progress_completed: i64,
    result: Value,
    message: Option<String>,
    owner: String,
    app_id: Option<String>,
    file_id: Option<String>,
    published: bool,
    deleted_at: Option<DateTime<Utc>>,
    embedding: Option<Value>,
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let kind: JobKind = row.kind.parse().map_err(RepositoryError::Corrupt)?;
        let status: JobStatus = row.status.parse().map_err(RepositoryError::Corrupt)?;
        let result = match row.result {
            Value::Array(items) => items,
            other => {
                return Err(RepositoryError::Corrupt(format!(
                    "job {} result is not an array: {}",
                    row.id, other
                )));
            }
        };
        let embedding: Option<EmbeddingConfig> =
            row.embedding.map(serde_json::from_value).transpose()?;

        Ok(Job {
            id: row.id,
            kind,
            name: row.name,
            status,
            created_at: row.created_at,
            completed_at: row.completed_at,
            progress: Progress {
                total: from_db_count(row.progress_total),
                completed: from_db_count(row.progress_completed),
            },
            result,
            message: row.message,
            owner: row.owner,
            source_refs: SourceRefs {
                app_id: row.app_id,
                file_id: row.file_id,
            },
            published: row.published,
            deleted_at: row.deleted_at,
            embedding,
        })
    }
}
