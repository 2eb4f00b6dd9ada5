//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::chunker::ChunkerConfig;
use crate::domain::params::RawParams;

/// Job execution record
///
/// Created by the orchestrator on submission and afterwards written only by
/// the worker that owns the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub name: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: Progress,
    /// One output map per completed batch row
    pub result: Vec<serde_json::Value>,
    pub message: Option<String>,
    pub owner: String,
    pub source_refs: SourceRefs,
    pub published: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Embedding configuration, kept so searches can reopen the vector store
    pub embedding: Option<EmbeddingConfig>,
}

impl Job {
    /// A fresh QUEUED job with `total` units to process
    pub fn queued(kind: JobKind, name: impl Into<String>, owner: impl Into<String>, total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            completed_at: None,
            progress: Progress::new(total),
            result: Vec::new(),
            message: None,
            owner: owner.into(),
            source_refs: SourceRefs::default(),
            published: false,
            deleted_at: None,
            embedding: None,
        }
    }

    /// Whether `viewer` may read this job
    pub fn is_visible_to(&self, viewer: &str) -> bool {
        self.deleted_at.is_none() && (self.owner == viewer || self.published)
    }
}

/// Kind of asynchronous work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Batch,
    Embedding,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Batch => "batch",
            JobKind::Embedding => "embedding",
        }
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(JobKind::Batch),
            "embedding" => Ok(JobKind::Embedding),
            other => Err(format!("unknown job kind: {}", other)),
        }
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Stopped => "STOPPED",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobStatus::Queued),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "STOPPED" => Ok(JobStatus::Stopped),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Units processed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
        }
    }
}

/// References to the records a job was created from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRefs {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
}

/// Embedding model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingModelConfig {
    pub model_provider: String,
    #[serde(default)]
    pub parameters: RawParams,
}

/// Vector store selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    pub vector_store_provider: String,
    #[serde(default)]
    pub parameters: RawParams,
}

/// Everything needed to build, and later reopen, an embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub chunker: ChunkerConfig,
    pub embedding_model: EmbeddingModelConfig,
    pub vector_store: VectorStoreConfig,
}
