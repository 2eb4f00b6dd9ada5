//! Provider layer
//!
//! Narrow traits over the external capabilities a pipeline consumes: model
//! completion, text embedding and vector similarity search. Steps only see
//! these traits; concrete clients are built by a `ProviderFactory`.
//!
//! All traits are object-safe so that tests can substitute scripted fakes.

mod anthropic;
mod http;
mod memory;
mod openai;
mod standard;

use async_trait::async_trait;
use catena_core::domain::credentials::Credentials;
use catena_core::domain::job::{EmbeddingConfig, EmbeddingModelConfig, VectorStoreConfig};
use catena_core::domain::params::{ModelParams, RawParams};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ConstructionError, StepError};

pub use anthropic::AnthropicChat;
pub use memory::{MEMORY_VECTOR_STORE, MemoryVectorRegistry, MemoryVectorStore};
pub use openai::{OpenAiChat, OpenAiEmbedding};
pub use standard::{ProviderSettings, StandardProviders};

/// Result of a model completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub result: String,
}

/// Turns a prompt into a completion
#[async_trait]
pub trait ModelProcessor: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, StepError>;
}

/// Turns text into an embedding vector
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StepError>;
}

/// Stores texts and retrieves the ones most similar to a query
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `k` stored texts, most similar first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StepError>;

    async fn add_text(&self, text: &str) -> Result<(), StepError>;
}

/// How a vector store collection is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreMode {
    /// Open an existing collection
    Read,
    /// Create a new collection; fails if it exists
    #[default]
    Create,
    /// Create the collection, replacing any existing one
    Overwrite,
}

impl VectorStoreMode {
    /// Mode requested by a store's `mode` parameter, falling back to `Create`
    pub fn from_params(params: &RawParams) -> Self {
        match params.get("mode").and_then(|v| v.as_str()) {
            Some(mode) => mode.parse().unwrap_or_else(|e: String| {
                warn!("{}, using create", e);
                VectorStoreMode::Create
            }),
            None => VectorStoreMode::Create,
        }
    }
}

impl FromStr for VectorStoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(VectorStoreMode::Read),
            "create" => Ok(VectorStoreMode::Create),
            "overwrite" => Ok(VectorStoreMode::Overwrite),
            other => Err(format!("unknown vector store mode: {}", other)),
        }
    }
}

/// Builds provider clients from configuration and credentials
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    fn model_processor(
        &self,
        params: ModelParams,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ModelProcessor>, ConstructionError>;

    fn embedding_model(
        &self,
        config: &EmbeddingModelConfig,
        credentials: &Credentials,
    ) -> Result<Arc<dyn EmbeddingModel>, ConstructionError>;

    /// Opens the collection `collection`, embedding texts with `embedding`
    async fn vector_store(
        &self,
        config: &VectorStoreConfig,
        collection: &str,
        embedding: Arc<dyn EmbeddingModel>,
        mode: VectorStoreMode,
    ) -> Result<Arc<dyn VectorStore>, ConstructionError>;
}

/// Looks up the configuration of a built embedding
#[async_trait]
pub trait EmbeddingCatalog: Send + Sync {
    /// Configuration of embedding `id`, if it exists and `viewer` may read it
    async fn find_embedding(
        &self,
        viewer: &str,
        id: Uuid,
    ) -> Result<Option<EmbeddingConfig>, ConstructionError>;
}

/// Reopens the vector store built for embedding `id`, read-only
///
/// Embeddings `viewer` cannot see are reported as unknown.
pub async fn open_embedding(
    providers: &dyn ProviderFactory,
    catalog: &dyn EmbeddingCatalog,
    viewer: &str,
    id: Uuid,
    credentials: &Credentials,
) -> Result<Arc<dyn VectorStore>, ConstructionError> {
    let config = catalog
        .find_embedding(viewer, id)
        .await?
        .ok_or(ConstructionError::UnknownEmbedding(id))?;

    let embedding = providers.embedding_model(&config.embedding_model, credentials)?;
    providers
        .vector_store(
            &config.vector_store,
            &id.to_string(),
            embedding,
            VectorStoreMode::Read,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vector_store_mode_from_params() {
        let params = |v: serde_json::Value| v.as_object().cloned().unwrap();

        assert_eq!(
            VectorStoreMode::from_params(&params(json!({"mode": "overwrite"}))),
            VectorStoreMode::Overwrite
        );
        assert_eq!(
            VectorStoreMode::from_params(&params(json!({"mode": "append"}))),
            VectorStoreMode::Create
        );
        assert_eq!(
            VectorStoreMode::from_params(&RawParams::new()),
            VectorStoreMode::Create
        );
    }
}
