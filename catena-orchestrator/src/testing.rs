//! Scripted provider doubles for service and API tests

use async_trait::async_trait;
use catena_core::domain::credentials::{Credentials, KeySource};
use catena_core::domain::job::{EmbeddingModelConfig, Job, JobStatus, VectorStoreConfig};
use catena_core::domain::params::ModelParams;
use catena_core::domain::quota::QuotaPolicy;
use catena_runner::provider::{
    Completion, EmbeddingModel, MemoryVectorRegistry, ModelProcessor, ProviderFactory,
    VectorStore, VectorStoreMode,
};
use catena_runner::{ConstructionError, StepError};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::PlatformKeys;
use crate::repository::{InMemoryJobRepository, InMemoryQuotaRepository, JobRepository};
use crate::service::JobService;

/// Echoes the prompt; `broken` fails and `slow` sleeps before echoing
struct ScriptedModel {
    model_name: String,
}

#[async_trait]
impl ModelProcessor for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<Completion, StepError> {
        match self.model_name.as_str() {
            "broken" => Err(StepError::api("openai", 500, "upstream unavailable")),
            "slow" => {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(Completion {
                    result: format!("echo: {}", prompt),
                })
            }
            _ => Ok(Completion {
                result: format!("echo: {}", prompt),
            }),
        }
    }
}

/// Embeds text as counts of the letters a, b and c
struct LetterEmbedding;

#[async_trait]
impl EmbeddingModel for LetterEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StepError> {
        Ok(['a', 'b', 'c']
            .iter()
            .map(|l| text.chars().filter(|c| c == l).count() as f32)
            .collect())
    }
}

#[derive(Default)]
pub struct FakeProviders {
    vectors: MemoryVectorRegistry,
}

#[async_trait]
impl ProviderFactory for FakeProviders {
    fn model_processor(
        &self,
        params: ModelParams,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ModelProcessor>, ConstructionError> {
        let provider = params.provider().as_str();
        if credentials.get(provider).is_none() {
            return Err(ConstructionError::MissingCredential(provider.to_string()));
        }
        Ok(Arc::new(ScriptedModel {
            model_name: params.model_name().to_string(),
        }))
    }

    fn embedding_model(
        &self,
        config: &EmbeddingModelConfig,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn EmbeddingModel>, ConstructionError> {
        if config.model_provider != "openai" {
            return Err(ConstructionError::UnsupportedEmbeddingModel(
                config.model_provider.clone(),
            ));
        }
        Ok(Arc::new(LetterEmbedding))
    }

    async fn vector_store(
        &self,
        config: &VectorStoreConfig,
        collection: &str,
        embedding: Arc<dyn EmbeddingModel>,
        mode: VectorStoreMode,
    ) -> Result<Arc<dyn VectorStore>, ConstructionError> {
        if config.vector_store_provider != "memory" {
            return Err(ConstructionError::UnsupportedVectorStore(
                config.vector_store_provider.clone(),
            ));
        }
        Ok(Arc::new(self.vectors.open(collection, embedding, mode)?))
    }
}

pub struct Harness {
    pub service: Arc<JobService>,
    pub jobs: Arc<dyn JobRepository>,
}

pub fn harness(initial_quota: i64, max_workers: usize) -> Harness {
    let jobs: Arc<dyn JobRepository> = Arc::new(InMemoryJobRepository::new());
    let policy = QuotaPolicy {
        initial_quota,
        ..QuotaPolicy::default()
    };
    let service = JobService::new(
        jobs.clone(),
        Arc::new(InMemoryQuotaRepository::new()),
        policy,
        Arc::new(FakeProviders::default()),
        max_workers,
        PlatformKeys::default(),
    );
    Harness {
        service: Arc::new(service),
        jobs,
    }
}

pub fn personal_key() -> Credentials {
    Credentials::new().with_key("openai", "sk-user", KeySource::Personal)
}

pub fn platform_key() -> Credentials {
    Credentials::new().with_key("openai", "sk-platform", KeySource::Platform)
}

/// Polls until the job reaches a terminal status
pub async fn wait_for_terminal(jobs: &Arc<dyn JobRepository>, id: Uuid) -> Job {
    for _ in 0..400 {
        if let Some(job) = jobs.find_by_id(id).await.unwrap() {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} did not finish", id);
}

/// Polls until at least `completed` units are committed
pub async fn wait_for_progress(jobs: &Arc<dyn JobRepository>, id: Uuid, completed: usize) -> Job {
    for _ in 0..400 {
        if let Some(job) = jobs.find_by_id(id).await.unwrap() {
            if job.progress.completed >= completed || job.status == JobStatus::Failed {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} made no progress", id);
}
