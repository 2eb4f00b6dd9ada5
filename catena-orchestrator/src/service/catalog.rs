//! Embedding catalog backed by job records

use async_trait::async_trait;
use catena_core::domain::job::{EmbeddingConfig, JobKind, JobStatus};
use catena_runner::ConstructionError;
use catena_runner::provider::EmbeddingCatalog;
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::JobRepository;

/// Resolves embedding ids to the configuration of a completed embedding job
/// the viewer can see: their own, or a published one
pub struct JobEmbeddingCatalog {
    jobs: Arc<dyn JobRepository>,
}

impl JobEmbeddingCatalog {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl EmbeddingCatalog for JobEmbeddingCatalog {
    async fn find_embedding(
        &self,
        viewer: &str,
        id: Uuid,
    ) -> Result<Option<EmbeddingConfig>, ConstructionError> {
        let job = self
            .jobs
            .find_by_id(id)
            .await
            .map_err(|e| ConstructionError::Catalog(e.to_string()))?;

        Ok(job
            .filter(|job| {
                job.kind == JobKind::Embedding
                    && job.status == JobStatus::Completed
                    && job.is_visible_to(viewer)
            })
            .and_then(|job| job.embedding))
    }
}
