//! Embedding API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use catena_core::dto::pipeline::{SearchDocuments, SearchResults};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::identity::UserId;
use crate::service::JobService;

/// POST /embedding/{id}/search
/// Passages of a built embedding most similar to the query
pub async fn search_documents(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
    Json(req): Json<SearchDocuments>,
) -> ApiResult<Json<SearchResults>> {
    tracing::debug!("Searching embedding {} (top {})", id, req.top_n);

    let passages = service.search_documents(&user, id, req).await?;
    Ok(Json(SearchResults { passages }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use catena_core::domain::job::{Job, JobKind};
    use catena_core::domain::credentials::Credentials;

    use crate::testing::harness;

    fn query() -> SearchDocuments {
        SearchDocuments {
            query: "anything".to_string(),
            top_n: 3,
            credentials: Credentials::new(),
        }
    }

    #[tokio::test]
    async fn test_search_unknown_embedding() {
        let h = harness(10, 1);
        let err = search_documents(
            State(h.service),
            UserId("u1".to_string()),
            Path(Uuid::new_v4()),
            Json(query()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_requires_embedding_job() {
        let h = harness(10, 1);
        let job = Job::queued(JobKind::Batch, "rows", "u1", 0);
        h.jobs.create(&job).await.unwrap();

        let err = search_documents(
            State(h.service),
            UserId("u1".to_string()),
            Path(job.id),
            Json(query()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
