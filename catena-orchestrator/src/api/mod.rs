//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain. Callers are
//! identified by the `x-user-id` header set by the upstream auth layer.

pub mod embedding;
pub mod error;
pub mod health;
pub mod identity;
pub mod job;
pub mod pipeline;
pub mod quota;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::JobService;

/// Create the main API router with all endpoints
pub fn create_router(service: Arc<JobService>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/run", post(pipeline::run_pipeline))
        .route("/pipeline/complete", post(pipeline::run_prompt))
        .route("/pipeline/text", post(pipeline::convert_text))
        .route("/pipeline/tag", post(pipeline::parse_tag))
        // Job endpoints
        .route("/job/batch", post(job::submit_batch_job))
        .route("/job/embedding", post(job::submit_embedding_job))
        .route("/job/list", get(job::list_jobs))
        .route("/job/{id}", get(job::get_job).delete(job::delete_job))
        .route("/job/{id}/status", get(job::get_job_status))
        .route("/job/{id}/stop", post(job::stop_job))
        .route("/job/{id}/publish", post(job::publish_job))
        // Embedding endpoints
        .route("/embedding/{id}/search", post(embedding::search_documents))
        // Quota endpoints
        .route("/quota", get(quota::get_quota))
        // Add state and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
