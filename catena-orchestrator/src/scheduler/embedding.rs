//! Embedding worker
//!
//! Adds pre-split chunks to a vector store collection named after the job.

use catena_core::domain::credentials::Credentials;
use catena_core::domain::job::{EmbeddingConfig, JobStatus, Progress};
use catena_runner::provider::{ProviderFactory, VectorStoreMode};
use std::sync::Arc;
use tracing::info;

use super::context::JobContext;
use crate::repository::RepositoryError;

/// Work accepted for an embedding job
pub struct EmbeddingJob {
    pub config: EmbeddingConfig,
    pub chunks: Vec<String>,
    pub credentials: Credentials,
}

pub async fn run_embedding(ctx: JobContext, providers: Arc<dyn ProviderFactory>, job: EmbeddingJob) {
    if let Err(e) = execute(&ctx, providers.as_ref(), job).await {
        ctx.abandon(e).await;
    }
}

async fn execute(
    ctx: &JobContext,
    providers: &dyn ProviderFactory,
    job: EmbeddingJob,
) -> Result<(), RepositoryError> {
    if ctx.is_cancelled() {
        return ctx.stopped().await;
    }

    let embedding = match providers.embedding_model(&job.config.embedding_model, &job.credentials) {
        Ok(embedding) => embedding,
        Err(e) => {
            return ctx
                .fail(&format!("embedding model load failure: {}", e))
                .await;
        }
    };

    let mode = VectorStoreMode::from_params(&job.config.vector_store.parameters);
    let store = match providers
        .vector_store(
            &job.config.vector_store,
            &ctx.job_id.to_string(),
            embedding,
            mode,
        )
        .await
    {
        Ok(store) => store,
        Err(e) => {
            return ctx
                .fail(&format!("vector store load failure: {}", e))
                .await;
        }
    };

    let provider = job.config.embedding_model.model_provider.as_str();
    let mut progress = Progress::new(job.chunks.len());

    info!(
        "Embedding job {} indexing {} chunks ({:?})",
        ctx.job_id, progress.total, mode
    );
    ctx.commit_progress(progress, &[]).await?;

    for (index, chunk) in job.chunks.iter().enumerate() {
        if ctx.is_cancelled() {
            info!(
                "Embedding job {} stopped after {} chunks",
                ctx.job_id, progress.completed
            );
            return ctx.stopped().await;
        }

        let cost = ctx
            .quota()
            .embedding_chunk_cost(index + 1, provider, &job.credentials);
        if let Err(e) = ctx.admit(cost).await {
            return ctx.refuse(e).await;
        }

        if let Err(e) = store.add_text(chunk).await {
            return ctx.fail(&e.to_string()).await;
        }

        progress.completed += 1;
        ctx.commit_progress(progress, &[]).await?;

        if let Err(e) = ctx.charge(cost).await {
            return ctx.refuse(e).await;
        }
    }

    ctx.finish(JobStatus::Completed, None).await
}
