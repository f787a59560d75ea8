//! Sampling batch handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClaimAdminId, SamplingBatchId, TaskGroupId};
use domain_sampling::CreateBatchRequest;

use crate::auth::{permissions, Claims};
use crate::dto::sampling::*;
use crate::{error::ApiError, AppState};

/// Unwraps a JSON body, reporting malformed input in the uniform error shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| ApiError::Validation {
        message: "Malformed request body".to_string(),
        detail: Some(rejection.body_text()),
    })
}

/// Creates a sampling batch over the claims matching the filters
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateSamplingBatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SamplingBatchResponse>), ApiError> {
    claims.require(permissions::SAMPLING_CREATE)?;
    let request = json_body(payload)?;
    request.validate()?;
    let filter = request.claim_filter()?;

    let batch = state
        .service
        .create_from_filter(
            &filter,
            CreateBatchRequest {
                percentage: request.percentage,
                candidates: Vec::new(),
                assigned_to: Some(ClaimAdminId::from_uuid(request.claim_admin_uuid)),
                task_group: request.task_group.map(TaskGroupId::from_uuid),
                requested_by: claims.user_id(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(batch.into())))
}

/// Reassigns a batch
pub async fn update_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateSamplingBatchRequest>, JsonRejection>,
) -> Result<Json<SamplingBatchResponse>, ApiError> {
    claims.require(permissions::SAMPLING_UPDATE)?;
    let request = json_body(payload)?;
    let batch = state
        .service
        .update_batch(
            SamplingBatchId::from_uuid(id),
            request.claim_admin_uuid.map(ClaimAdminId::from_uuid),
        )
        .await?;
    Ok(Json(batch.into()))
}

/// Gets a batch by ID
pub async fn get_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SamplingBatchResponse>, ApiError> {
    claims.require(permissions::SAMPLING_READ)?;
    let batch = state.service.get_batch(SamplingBatchId::from_uuid(id)).await?;
    Ok(Json(batch.into()))
}

/// Lists the claims of a batch with their assignment status
pub async fn batch_claims(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BatchClaimResponse>>, ApiError> {
    claims.require(permissions::SAMPLING_READ)?;
    let entries = state
        .service
        .sampling_batch_claims(SamplingBatchId::from_uuid(id))
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SamplingSummaryResponse>, ApiError> {
    claims.require(permissions::SAMPLING_READ)?;
    let summary = state
        .service
        .prepare_sampling_summary(SamplingBatchId::from_uuid(id))
        .await?;
    Ok(Json(summary.into()))
}

/// Extrapolates the review outcome onto the unreviewed claims
pub async fn extrapolate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ErrorListResponse>, ApiError> {
    claims.require(permissions::SAMPLING_APPROVE)?;
    let errors = state
        .service
        .extrapolate_results(SamplingBatchId::from_uuid(id), claims.user_id())
        .await?;
    Ok(Json(errors.into()))
}
