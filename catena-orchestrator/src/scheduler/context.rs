//! Job execution context
//!
//! The explicit handle a worker receives for the job it owns: identity,
//! cancellation token and the stores it reports to. Dropping the context
//! unregisters the job's cancellation token.

use catena_core::domain::job::{JobStatus, Progress};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::registry::CancellationRegistry;
use crate::repository::{JobRepository, RepositoryError};
use crate::service::quota::{AdmissionError, QuotaService};

pub struct JobContext {
    pub job_id: Uuid,
    pub owner: String,
    token: CancellationToken,
    jobs: Arc<dyn JobRepository>,
    quota: Arc<QuotaService>,
    registry: Arc<CancellationRegistry>,
}

impl JobContext {
    pub fn new(
        job_id: Uuid,
        owner: impl Into<String>,
        token: CancellationToken,
        jobs: Arc<dyn JobRepository>,
        quota: Arc<QuotaService>,
        registry: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            job_id,
            owner: owner.into(),
            token,
            jobs,
            quota,
            registry,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn quota(&self) -> &QuotaService {
        &self.quota
    }

    /// Fails unless the owner can afford `cost`
    pub async fn admit(&self, cost: i64) -> Result<(), AdmissionError> {
        self.quota.check(&self.owner, cost).await
    }

    /// Charges the owner for a unit that has completed
    pub async fn charge(&self, cost: i64) -> Result<(), AdmissionError> {
        self.quota.debit(&self.owner, cost).await
    }

    /// Persists a RUNNING snapshot
    pub async fn commit_progress(
        &self,
        progress: Progress,
        result: &[Value],
    ) -> Result<(), RepositoryError> {
        debug!(
            "Job {} progress {}/{}",
            self.job_id, progress.completed, progress.total
        );
        self.jobs
            .update_progress(self.job_id, JobStatus::Running, progress, result)
            .await
    }

    /// Moves the job to a terminal status
    pub async fn finish(
        &self,
        status: JobStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        match message {
            Some(message) => info!("Job {} finished {}: {}", self.job_id, status, message),
            None => info!("Job {} finished {}", self.job_id, status),
        }
        self.jobs.finish(self.job_id, status, message).await
    }

    pub async fn stopped(&self) -> Result<(), RepositoryError> {
        self.finish(JobStatus::Stopped, None).await
    }

    pub async fn fail(&self, message: &str) -> Result<(), RepositoryError> {
        self.finish(JobStatus::Failed, Some(message)).await
    }

    /// Last attempt to persist a storage failure as FAILED
    pub async fn abandon(&self, err: RepositoryError) {
        error!("Job {} hit a storage error: {}", self.job_id, err);
        if let Err(e) = self.fail(&format!("storage failure: {}", err)).await {
            error!("Job {} left unfinished: {}", self.job_id, e);
        }
    }

    /// Fails the job for a refused admission; storage errors propagate
    pub async fn refuse(&self, err: AdmissionError) -> Result<(), RepositoryError> {
        match err {
            AdmissionError::InsufficientQuota { .. } => self.fail(&err.to_string()).await,
            AdmissionError::Repository(e) => Err(e),
        }
    }
}

impl Drop for JobContext {
    fn drop(&mut self) {
        self.registry.remove(self.job_id);
    }
}
