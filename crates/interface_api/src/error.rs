//! API error handling
//!
//! Every failure is rendered as `{"errors": [{"message": ..., "detail": ...}]}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_sampling::SamplingError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            detail: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// One entry of the error list
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEntry {
    pub message: String,
    pub detail: Option<String>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorEntry>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let entry = match self {
            ApiError::Validation { message, detail } => ErrorEntry { message, detail },
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Request failed");
                ErrorEntry {
                    message: "Internal server error".to_string(),
                    detail: Some(detail),
                }
            }
            ApiError::NotFound(detail)
            | ApiError::BadRequest(detail)
            | ApiError::Unauthorized(detail)
            | ApiError::Forbidden(detail)
            | ApiError::Conflict(detail) => ErrorEntry {
                message: status
                    .canonical_reason()
                    .unwrap_or("Error")
                    .to_string(),
                detail: Some(detail),
            },
        };

        (status, Json(ErrorResponse { errors: vec![entry] })).into_response()
    }
}

impl From<SamplingError> for ApiError {
    fn from(err: SamplingError) -> Self {
        if err.is_validation() {
            return ApiError::Validation {
                message: "Invalid sampling request".to_string(),
                detail: Some(err.to_string()),
            };
        }
        match err {
            SamplingError::BatchNotFound(_) => ApiError::NotFound(err.to_string()),
            SamplingError::BatchAlreadyApplied(_) => ApiError::Conflict(err.to_string()),
            SamplingError::DeductibleRatioUndefined { .. } => ApiError::Validation {
                message: "Extrapolation is not possible".to_string(),
                detail: Some(err.to_string()),
            },
            SamplingError::Port(port) => port.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match &err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Validation { message, field } => ApiError::Validation {
                message: message.clone(),
                detail: field.clone(),
            },
            PortError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            PortError::Unauthorized { .. } => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation {
            message: "Request validation failed".to_string(),
            detail: Some(errors.to_string()),
        }
    }
}
