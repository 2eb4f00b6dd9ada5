//! Job API Handlers
//!
//! HTTP endpoints for job submission and lifecycle management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use catena_core::domain::job::Job;
use catena_core::dto::job::{
    CreateBatchJob, CreateEmbeddingJob, JobCreated, JobStatusView, JobSummary, ListJobsQuery,
    StopOutcome,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::identity::UserId;
use crate::service::JobService;

// =============================================================================
// Submission Endpoints
// =============================================================================

/// POST /job/batch
/// Queue a pipeline run for every row of a table
pub async fn submit_batch_job(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Json(req): Json<CreateBatchJob>,
) -> ApiResult<(StatusCode, Json<JobCreated>)> {
    tracing::info!("Submitting batch job '{}' for {}", req.name, user);

    let job_id = service.submit_batch_job(&user, req).await?;
    Ok((StatusCode::CREATED, Json(JobCreated { job_id })))
}

/// POST /job/embedding
/// Queue a document for chunking and indexing
pub async fn submit_embedding_job(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Json(req): Json<CreateEmbeddingJob>,
) -> ApiResult<(StatusCode, Json<JobCreated>)> {
    tracing::info!("Submitting embedding job '{}' for {}", req.name, user);

    let job_id = service.submit_embedding_job(&user, req).await?;
    Ok((StatusCode::CREATED, Json(JobCreated { job_id })))
}

// =============================================================================
// Query Endpoints
// =============================================================================

/// GET /job/list
/// Jobs owned by the caller plus published jobs, newest first
pub async fn list_jobs(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    tracing::debug!("Listing jobs for {}", user);

    let jobs = service.list_jobs(&user, query.kind).await?;
    Ok(Json(jobs))
}

/// GET /job/{id}
pub async fn get_job(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = service.get_job(&user, id).await?;
    Ok(Json(job))
}

/// GET /job/{id}/status
pub async fn get_job_status(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobStatusView>> {
    let status = service.get_job_status(&user, id).await?;
    Ok(Json(status))
}

// =============================================================================
// Lifecycle Endpoints
// =============================================================================

/// POST /job/{id}/stop
pub async fn stop_job(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StopOutcome>> {
    tracing::info!("Stopping job {} for {}", id, user);

    let outcome = service.stop_job(&user, id).await?;
    Ok(Json(outcome))
}

/// POST /job/{id}/publish
pub async fn publish_job(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    service.publish_job(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /job/{id}
pub async fn delete_job(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting job: {}", id);

    service.delete_job(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use catena_core::domain::job::{JobKind, JobStatus};
    use serde_json::json;

    use crate::testing::{harness, wait_for_terminal};

    fn user(id: &str) -> UserId {
        UserId(id.to_string())
    }

    #[tokio::test]
    async fn test_submit_then_poll() {
        let h = harness(10, 1);
        let req: CreateBatchJob = serde_json::from_value(json!({
            "name": "greetings",
            "steps": [{"name": "greeting", "type": "text", "input": "hi {who}"}],
            "rows": [{"who": "ann"}, {"who": "bob"}]
        }))
        .unwrap();

        let (status, Json(created)) =
            submit_batch_job(State(h.service.clone()), user("u1"), Json(req))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        wait_for_terminal(&h.jobs, created.job_id).await;
        let Json(view) = get_job_status(
            State(h.service.clone()),
            user("u1"),
            Path(created.job_id),
        )
        .await
        .unwrap();
        assert_eq!(view.status, JobStatus::Completed);
        assert_eq!(view.progress.completed, 2);

        let Json(jobs) = list_jobs(
            State(h.service),
            user("u1"),
            Query(ListJobsQuery {
                kind: Some(JobKind::Batch),
            }),
        )
        .await
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "greetings");
    }

    #[tokio::test]
    async fn test_foreign_job_is_not_found() {
        let h = harness(10, 1);
        let job = Job::queued(JobKind::Batch, "private", "u1", 1);
        h.jobs.create(&job).await.unwrap();

        let err = get_job(State(h.service), user("u2"), Path(job.id))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_publish_running_job_conflicts() {
        let h = harness(10, 1);
        let job = Job::queued(JobKind::Batch, "pending", "u1", 1);
        h.jobs.create(&job).await.unwrap();

        let err = publish_job(State(h.service), user("u1"), Path(job.id))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_stop_and_delete() {
        let h = harness(10, 1);
        let job = Job::queued(JobKind::Batch, "orphan", "u1", 1);
        h.jobs.create(&job).await.unwrap();

        let Json(outcome) = stop_job(State(h.service.clone()), user("u1"), Path(job.id))
            .await
            .unwrap();
        assert!(outcome.stopped);

        let status = delete_job(State(h.service.clone()), user("u1"), Path(job.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_job(State(h.service), user("u1"), Path(job.id))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
