//! Job DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::credentials::Credentials;
use crate::domain::job::{EmbeddingConfig, Job, JobKind, JobStatus, Progress, SourceRefs};
use crate::domain::step::StepDefinition;
use crate::template::Variables;

/// Request to run a pipeline once per row of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchJob {
    pub name: String,
    pub steps: Vec<StepDefinition>,
    /// Values shared by every row; row columns take precedence
    #[serde(default)]
    pub inputs: Variables,
    pub rows: Vec<Variables>,
    #[serde(default)]
    pub source_refs: SourceRefs,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Request to chunk a document and index it into a vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmbeddingJob {
    pub name: String,
    #[serde(flatten)]
    pub config: EmbeddingConfig,
    pub text: String,
    #[serde(default)]
    pub source_refs: SourceRefs,
    #[serde(default)]
    pub credentials: Credentials,
}

/// Response to an accepted job submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: Uuid,
}

/// Lightweight status poll response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: Progress,
    pub message: Option<String>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            progress: job.progress,
            message: job.message.clone(),
        }
    }
}

/// Outcome of a stop request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub stopped: bool,
    pub message: String,
}

impl StopOutcome {
    pub fn stopped() -> Self {
        Self {
            stopped: true,
            message: "stop requested".to_string(),
        }
    }

    pub fn already_finished(status: JobStatus) -> Self {
        Self {
            stopped: false,
            message: format!("job already finished with status {}", status),
        }
    }
}

/// Job listing entry (results omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub kind: JobKind,
    pub name: String,
    pub status: JobStatus,
    pub owner: String,
    pub published: bool,
    pub progress: Progress,
    pub source_refs: SourceRefs,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            name: job.name,
            status: job.status,
            owner: job.owner,
            published: job.published,
            progress: job.progress,
            source_refs: job.source_refs,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// Query parameters of the job listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub kind: Option<JobKind>,
}
