//! Default provider factory
//!
//! Builds reqwest-backed OpenAI and Anthropic clients and opens collections of
//! the in-process vector store.

use async_trait::async_trait;
use catena_core::domain::credentials::Credentials;
use catena_core::domain::job::{EmbeddingModelConfig, VectorStoreConfig};
use catena_core::domain::params::{
    AllowList, ModelParams, ModelProvider, OpenAiEmbeddingParams, filter_allowed,
};
use std::sync::Arc;
use tracing::debug;

use super::memory::{MEMORY_VECTOR_STORE, MemoryVectorRegistry};
use super::{
    AnthropicChat, EmbeddingModel, ModelProcessor, OpenAiChat, OpenAiEmbedding, ProviderFactory,
    VectorStore, VectorStoreMode,
};
use crate::error::ConstructionError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Provider endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub openai_base_url: String,
    pub anthropic_base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        }
    }
}

/// Standard implementation of ProviderFactory
pub struct StandardProviders {
    settings: ProviderSettings,
    vectors: Arc<MemoryVectorRegistry>,
}

impl StandardProviders {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            vectors: Arc::new(MemoryVectorRegistry::new()),
        }
    }

    /// The registry backing the `memory` vector store
    pub fn vectors(&self) -> Arc<MemoryVectorRegistry> {
        self.vectors.clone()
    }
}

fn api_key<'a>(credentials: &'a Credentials, provider: &str) -> Result<&'a str, ConstructionError> {
    credentials
        .get(provider)
        .map(|k| k.key.as_str())
        .ok_or_else(|| ConstructionError::MissingCredential(provider.to_string()))
}

#[async_trait]
impl ProviderFactory for StandardProviders {
    fn model_processor(
        &self,
        params: ModelParams,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ModelProcessor>, ConstructionError> {
        let key = api_key(credentials, params.provider().as_str())?;
        debug!(
            "Building {} model processor for {}",
            params.provider(),
            params.model_name()
        );

        let processor: Arc<dyn ModelProcessor> = match params {
            ModelParams::OpenAi(p) => {
                Arc::new(OpenAiChat::new(&self.settings.openai_base_url, key, p)?)
            }
            ModelParams::Anthropic(p) => {
                Arc::new(AnthropicChat::new(&self.settings.anthropic_base_url, key, p)?)
            }
        };
        Ok(processor)
    }

    fn embedding_model(
        &self,
        config: &EmbeddingModelConfig,
        credentials: &Credentials,
    ) -> Result<Arc<dyn EmbeddingModel>, ConstructionError> {
        match config.model_provider.parse::<ModelProvider>() {
            Ok(ModelProvider::OpenAi) => {
                let params = OpenAiEmbeddingParams::from_raw("openai embedding", &config.parameters)?;
                let key = api_key(credentials, ModelProvider::OpenAi.as_str())?;
                Ok(Arc::new(OpenAiEmbedding::new(
                    &self.settings.openai_base_url,
                    key,
                    params,
                )?))
            }
            _ => Err(ConstructionError::UnsupportedEmbeddingModel(
                config.model_provider.clone(),
            )),
        }
    }

    async fn vector_store(
        &self,
        config: &VectorStoreConfig,
        collection: &str,
        embedding: Arc<dyn EmbeddingModel>,
        mode: VectorStoreMode,
    ) -> Result<Arc<dyn VectorStore>, ConstructionError> {
        if config.vector_store_provider != MEMORY_VECTOR_STORE {
            return Err(ConstructionError::UnsupportedVectorStore(
                config.vector_store_provider.clone(),
            ));
        }
        // Only warns; the mode itself is chosen by the caller
        filter_allowed(MEMORY_VECTOR_STORE, &config.parameters, &["mode"]);

        debug!("Opening vector store collection {} ({:?})", collection, mode);
        Ok(Arc::new(self.vectors.open(collection, embedding, mode)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catena_core::domain::credentials::KeySource;
    use catena_core::domain::params::RawParams;
    use serde_json::json;

    fn providers() -> StandardProviders {
        StandardProviders::new(ProviderSettings::default())
    }

    #[test]
    fn test_missing_credential_names_provider() {
        let params = ModelParams::parse(ModelProvider::Anthropic, &RawParams::new()).unwrap();
        let result = providers().model_processor(params, &Credentials::new());

        assert!(matches!(
            result,
            Err(ConstructionError::MissingCredential(p)) if p == "anthropic"
        ));
    }

    #[test]
    fn test_model_processor_with_credential() {
        let creds = Credentials::new().with_key("openai", "sk", KeySource::Personal);
        let params = ModelParams::parse(ModelProvider::OpenAi, &RawParams::new()).unwrap();

        assert!(providers().model_processor(params, &creds).is_ok());
    }

    #[test]
    fn test_unsupported_embedding_model() {
        let config = EmbeddingModelConfig {
            model_provider: "anthropic".to_string(),
            parameters: RawParams::new(),
        };
        let result = providers().embedding_model(&config, &Credentials::new());

        assert!(matches!(
            result,
            Err(ConstructionError::UnsupportedEmbeddingModel(p)) if p == "anthropic"
        ));
    }

    #[test]
    fn test_embedding_model_rejects_bad_parameters() {
        let creds = Credentials::new().with_key("openai", "sk", KeySource::Platform);
        let config = EmbeddingModelConfig {
            model_provider: "openai".to_string(),
            parameters: json!({"request_timeout": "soon"}).as_object().cloned().unwrap(),
        };

        assert!(matches!(
            providers().embedding_model(&config, &creds),
            Err(ConstructionError::Params(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_vector_store() {
        let creds = Credentials::new().with_key("openai", "sk", KeySource::Platform);
        let providers = providers();
        let embedding = providers
            .embedding_model(
                &EmbeddingModelConfig {
                    model_provider: "openai".to_string(),
                    parameters: RawParams::new(),
                },
                &creds,
            )
            .unwrap();
        let config = VectorStoreConfig {
            vector_store_provider: "lancedb".to_string(),
            parameters: RawParams::new(),
        };

        let result = providers
            .vector_store(&config, "c1", embedding, VectorStoreMode::Create)
            .await;
        assert!(matches!(
            result,
            Err(ConstructionError::UnsupportedVectorStore(p)) if p == "lancedb"
        ));
    }
}
