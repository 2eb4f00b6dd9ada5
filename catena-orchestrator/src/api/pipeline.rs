//! Pipeline API Handlers
//!
//! Synchronous pipeline runs and the standalone step operations.

use axum::{Json, extract::State};
use catena_core::dto::pipeline::{
    ConvertText, ParseTag, PipelineOutputs, RunPipeline, RunPrompt, TextResult,
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::identity::UserId;
use crate::service::JobService;

/// POST /pipeline/run
/// Run a pipeline once and return its outputs
pub async fn run_pipeline(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Json(req): Json<RunPipeline>,
) -> ApiResult<Json<PipelineOutputs>> {
    tracing::info!("Running {}-step pipeline for {}", req.steps.len(), user);

    let outputs = service.run_pipeline_sync(&user, req).await?;
    Ok(Json(PipelineOutputs { outputs }))
}

/// POST /pipeline/complete
/// Single model completion
pub async fn run_prompt(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
    Json(req): Json<RunPrompt>,
) -> ApiResult<Json<TextResult>> {
    tracing::info!("Running {} completion for {}", req.model_provider, user);

    let result = service.run_prompt_sync(&user, req).await?;
    Ok(Json(TextResult { result }))
}

/// POST /pipeline/text
pub async fn convert_text(
    State(service): State<Arc<JobService>>,
    Json(req): Json<ConvertText>,
) -> Json<TextResult> {
    Json(TextResult {
        result: service.convert_text(&req),
    })
}

/// POST /pipeline/tag
pub async fn parse_tag(
    State(service): State<Arc<JobService>>,
    Json(req): Json<ParseTag>,
) -> ApiResult<Json<TextResult>> {
    tracing::debug!("Parsing <{}> section", req.tag);

    let result = service.parse_tag(&req)?;
    Ok(Json(TextResult { result }))
}
