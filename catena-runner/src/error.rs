//! Error types for pipeline construction and execution

use catena_core::chunker::ChunkerError;
use catena_core::domain::params::ParamError;
use thiserror::Error;
use uuid::Uuid;

/// A pipeline, provider or vector store could not be built
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    /// No API key available for the provider
    #[error("missing credential for {0}")]
    MissingCredential(String),

    #[error("{0} is not a supported embedding model")]
    UnsupportedEmbeddingModel(String),

    #[error("{0} is not a supported vector store")]
    UnsupportedVectorStore(String),

    #[error("vector store collection {0} does not exist")]
    MissingCollection(String),

    #[error("vector store collection {0} already exists")]
    CollectionExists(String),

    #[error("embedding {0} not found")]
    UnknownEmbedding(Uuid),

    #[error("embedding lookup failed: {0}")]
    Catalog(String),

    #[error("duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("invalid tag {tag}: {source}")]
    InvalidTag {
        tag: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// An external call made by a step failed
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{provider} request failed: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("unexpected {provider} response: {message}")]
    Response { provider: String, message: String },

    #[error("vector store error: {0}")]
    VectorStore(String),
}

impl StepError {
    pub fn request(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            provider: provider.into(),
            source,
        }
    }

    pub fn api(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Response {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
