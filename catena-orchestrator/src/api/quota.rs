//! Quota API Handlers

use axum::{Json, extract::State};
use catena_core::dto::quota::QuotaView;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::identity::UserId;
use crate::service::JobService;

/// GET /quota
/// The caller's remaining and spent quota
pub async fn get_quota(
    State(service): State<Arc<JobService>>,
    UserId(user): UserId,
) -> ApiResult<Json<QuotaView>> {
    let quota = service.get_quota(&user).await?;
    Ok(Json(quota))
}
