//! Job Service
//!
//! The orchestrator's exposed surface: synchronous pipeline runs, job
//! submission and the job lifecycle (status, stop, publish, delete).
//!
//! Submitted jobs are persisted as QUEUED, given a cancellation token and
//! handed to the worker pool; everything after that is written by the worker.

use catena_core::chunker::TextSplitter;
use catena_core::domain::credentials::Credentials;
use catena_core::domain::job::{Job, JobKind, JobStatus};
use catena_core::domain::params::{ModelParams, ModelProvider, RawParams};
use catena_core::domain::quota::QuotaPolicy;
use catena_core::dto::job::{
    CreateBatchJob, CreateEmbeddingJob, JobStatusView, JobSummary, StopOutcome,
};
use catena_core::dto::pipeline::{ConvertText, ParseTag, RunPipeline, RunPrompt, SearchDocuments};
use catena_core::dto::quota::QuotaView;
use catena_runner::provider::ProviderFactory;
use catena_runner::{ChainLoader, ConstructionError, Outputs, StepError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::catalog::JobEmbeddingCatalog;
use super::quota::{AdmissionError, QuotaService};
use crate::config::PlatformKeys;
use crate::repository::{JobRepository, QuotaRepository, RepositoryError};
use crate::scheduler::{
    BatchJob, CancellationRegistry, EmbeddingJob, JobContext, WorkerPool, run_batch,
    run_embedding,
};

/// Service error type
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {0} belongs to another user")]
    Forbidden(Uuid),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("Insufficient quota: required {required}, available {available}")]
    InsufficientQuota { required: i64, available: i64 },

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<AdmissionError> for ServiceError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::InsufficientQuota {
                required,
                available,
            } => ServiceError::InsufficientQuota {
                required,
                available,
            },
            AdmissionError::Repository(e) => ServiceError::Repository(e),
        }
    }
}

pub struct JobService {
    jobs: Arc<dyn JobRepository>,
    quota: Arc<QuotaService>,
    loader: ChainLoader,
    pool: WorkerPool,
    registry: Arc<CancellationRegistry>,
    platform_keys: PlatformKeys,
}

impl JobService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        quotas: Arc<dyn QuotaRepository>,
        policy: QuotaPolicy,
        providers: Arc<dyn ProviderFactory>,
        max_workers: usize,
        platform_keys: PlatformKeys,
    ) -> Self {
        let catalog = Arc::new(JobEmbeddingCatalog::new(jobs.clone()));

        Self {
            jobs,
            quota: Arc::new(QuotaService::new(quotas, policy)),
            loader: ChainLoader::new(providers, catalog),
            pool: WorkerPool::new(max_workers),
            registry: Arc::new(CancellationRegistry::new()),
            platform_keys,
        }
    }

    fn credentials(&self, supplied: Credentials) -> Credentials {
        self.platform_keys.apply(supplied)
    }

    // =========================================================================
    // Synchronous runs
    // =========================================================================

    /// Runs a pipeline once; quota is checked before and debited after
    pub async fn run_pipeline_sync(
        &self,
        owner: &str,
        req: RunPipeline,
    ) -> Result<Outputs, ServiceError> {
        let credentials = self.credentials(req.credentials);
        let cost = self.quota.pipeline_cost(&req.steps, &credentials);
        self.quota.check(owner, cost).await?;

        let chain = self.loader.load(&req.steps, owner, &credentials).await?;
        let outputs = chain.run(req.inputs).await?;

        self.quota.debit(owner, cost).await?;
        debug!("Pipeline run for {} cost {}", owner, cost);
        Ok(outputs)
    }

    /// Single model completion, billed as one model call
    pub async fn run_prompt_sync(&self, owner: &str, req: RunPrompt) -> Result<String, ServiceError> {
        let credentials = self.credentials(req.credentials);
        let params = parse_model_params(&req.model_provider, &req.parameters)?;
        let cost = self.quota.model_cost(
            params.provider().as_str(),
            Some(params.model_name()),
            &credentials,
        );
        self.quota.check(owner, cost).await?;

        let processor = self
            .loader
            .providers()
            .model_processor(params, &credentials)?;
        let prompt = catena_runner::convert_text(&req.input, &req.inputs);
        let completion = processor.complete(&prompt).await?;

        self.quota.debit(owner, cost).await?;
        Ok(completion.result)
    }

    pub fn convert_text(&self, req: &ConvertText) -> String {
        catena_runner::convert_text(&req.input, &req.inputs)
    }

    pub fn parse_tag(&self, req: &ParseTag) -> Result<String, ServiceError> {
        Ok(catena_runner::parse_tag(&req.tag, &req.input, &req.inputs)?)
    }

    /// Similarity search against a completed embedding job
    pub async fn search_documents(
        &self,
        viewer: &str,
        embedding_id: Uuid,
        req: SearchDocuments,
    ) -> Result<Vec<String>, ServiceError> {
        if req.top_n == 0 {
            return Err(ServiceError::InvalidRequest(
                "top_n must be greater than 0".to_string(),
            ));
        }

        let job = self.visible_job(viewer, embedding_id).await?;
        if job.kind != JobKind::Embedding {
            return Err(ServiceError::InvalidRequest(format!(
                "Job {} is not an embedding",
                embedding_id
            )));
        }

        let credentials = self.credentials(req.credentials);
        let store = self
            .loader
            .open_embedding(viewer, embedding_id, &credentials)
            .await?;
        Ok(store.similarity_search(&req.query, req.top_n).await?)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    pub async fn submit_batch_job(
        &self,
        owner: &str,
        req: CreateBatchJob,
    ) -> Result<Uuid, ServiceError> {
        if req.steps.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "a batch job needs at least one step".to_string(),
            ));
        }

        let mut job = Job::queued(JobKind::Batch, req.name, owner, req.rows.len());
        job.source_refs = req.source_refs;
        self.jobs.create(&job).await?;

        let work = BatchJob {
            steps: req.steps,
            inputs: req.inputs,
            rows: req.rows,
            credentials: self.credentials(req.credentials),
        };
        let ctx = self.context(&job);
        self.pool
            .spawn(job.id, run_batch(ctx, self.loader.clone(), work));

        info!(
            "Batch job {} queued for {} ({} rows, {} workers free)",
            job.id,
            owner,
            job.progress.total,
            self.pool.available()
        );
        Ok(job.id)
    }

    /// Chunks the document and queues it for indexing
    ///
    /// An unsupported chunker is rejected here; no job is created.
    pub async fn submit_embedding_job(
        &self,
        owner: &str,
        req: CreateEmbeddingJob,
    ) -> Result<Uuid, ServiceError> {
        let splitter =
            TextSplitter::from_config(&req.config.chunker).map_err(ConstructionError::from)?;
        let text = req.text;
        let chunks = tokio::task::spawn_blocking(move || splitter.split(&text)).await?;

        let mut job = Job::queued(JobKind::Embedding, req.name, owner, chunks.len());
        job.source_refs = req.source_refs;
        job.embedding = Some(req.config.clone());
        self.jobs.create(&job).await?;

        let work = EmbeddingJob {
            config: req.config,
            chunks,
            credentials: self.credentials(req.credentials),
        };
        let ctx = self.context(&job);
        self.pool.spawn(
            job.id,
            run_embedding(ctx, self.loader.providers().clone(), work),
        );

        info!(
            "Embedding job {} queued for {} ({} chunks)",
            job.id, owner, job.progress.total
        );
        Ok(job.id)
    }

    fn context(&self, job: &Job) -> JobContext {
        let token = self.registry.register(job.id);
        JobContext::new(
            job.id,
            job.owner.clone(),
            token,
            self.jobs.clone(),
            self.quota.clone(),
            self.registry.clone(),
        )
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn visible_job(&self, viewer: &str, id: Uuid) -> Result<Job, ServiceError> {
        self.jobs
            .find_by_id(id)
            .await?
            .filter(|job| job.is_visible_to(viewer))
            .ok_or(ServiceError::NotFound(id))
    }

    async fn owned_job(&self, owner: &str, id: Uuid) -> Result<Job, ServiceError> {
        let job = self.visible_job(owner, id).await?;
        if job.owner != owner {
            return Err(ServiceError::Forbidden(id));
        }
        Ok(job)
    }

    pub async fn get_job(&self, viewer: &str, id: Uuid) -> Result<Job, ServiceError> {
        self.visible_job(viewer, id).await
    }

    pub async fn get_job_status(&self, viewer: &str, id: Uuid) -> Result<JobStatusView, ServiceError> {
        let job = self.visible_job(viewer, id).await?;
        Ok(JobStatusView::from(&job))
    }

    pub async fn list_jobs(
        &self,
        viewer: &str,
        kind: Option<JobKind>,
    ) -> Result<Vec<JobSummary>, ServiceError> {
        let jobs = self.jobs.list_visible(viewer, kind).await?;
        Ok(jobs.into_iter().map(JobSummary::from).collect())
    }

    /// Requests that a job stop at its next unit boundary
    pub async fn stop_job(&self, owner: &str, id: Uuid) -> Result<StopOutcome, ServiceError> {
        let job = self.owned_job(owner, id).await?;
        if job.status.is_terminal() {
            return Ok(StopOutcome::already_finished(job.status));
        }

        if self.registry.cancel(id) {
            info!("Stop requested for job {}", id);
            return Ok(StopOutcome::stopped());
        }

        // No live worker: the job may have just finished, or was orphaned
        let job = self.owned_job(owner, id).await?;
        if job.status.is_terminal() {
            return Ok(StopOutcome::already_finished(job.status));
        }

        info!("Job {} has no worker, marking it stopped", id);
        self.jobs.finish(id, JobStatus::Stopped, None).await?;
        Ok(StopOutcome::stopped())
    }

    /// Soft-deletes a job, stopping its worker if one is running
    pub async fn delete_job(&self, owner: &str, id: Uuid) -> Result<(), ServiceError> {
        self.owned_job(owner, id).await?;

        if self.registry.cancel(id) {
            debug!("Cancelled worker of deleted job {}", id);
        }

        if !self.jobs.soft_delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        info!("Job {} deleted by {}", id, owner);
        Ok(())
    }

    /// Makes a completed job visible to every user
    pub async fn publish_job(&self, owner: &str, id: Uuid) -> Result<(), ServiceError> {
        let job = self.owned_job(owner, id).await?;
        if job.status != JobStatus::Completed {
            return Err(ServiceError::InvalidState(format!(
                "Job {} is {}; only COMPLETED jobs can be published",
                id, job.status
            )));
        }

        self.jobs.publish(id).await?;
        info!("Job {} published by {}", id, owner);
        Ok(())
    }

    pub async fn get_quota(&self, user_id: &str) -> Result<QuotaView, ServiceError> {
        Ok(self.quota.ledger(user_id).await?.into())
    }
}

fn parse_model_params(provider: &str, raw: &RawParams) -> Result<ModelParams, ConstructionError> {
    let provider: ModelProvider = provider.parse()?;
    Ok(ModelParams::parse(provider, raw)?)
}
