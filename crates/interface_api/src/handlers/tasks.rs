//! Task subsystem callbacks

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use domain_sampling::TaskResolution;

use crate::auth::{permissions, Claims};
use crate::dto::sampling::{ErrorListResponse, SamplingBatchResponse};
use crate::handlers::sampling::json_body;
use crate::{error::ApiError, AppState};

/// A review task was resolved
///
/// Returns the batch when the resolution applied to it, `null` otherwise.
pub async fn task_resolved(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TaskResolution>, JsonRejection>,
) -> Result<Json<Option<SamplingBatchResponse>>, ApiError> {
    claims.require(permissions::SAMPLING_APPROVE)?;
    let resolution = json_body(payload)?;
    let batch = state.service.on_task_resolved(&resolution).await?;
    Ok(Json(batch.map(Into::into)))
}

/// A review task was completed; extrapolates its batch
pub async fn task_completed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TaskResolution>, JsonRejection>,
) -> Result<Json<ErrorListResponse>, ApiError> {
    claims.require(permissions::SAMPLING_APPROVE)?;
    let resolution = json_body(payload)?;
    let errors = state.service.on_task_completed(&resolution).await?;
    Ok(Json(errors.into()))
}
