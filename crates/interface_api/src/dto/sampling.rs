//! Sampling DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use domain_sampling::{
    AssignmentStatus, BatchClaim, ClaimFilter, ClaimProcessingError, ClaimStatus, ReviewStatus,
    SamplingBatch, SamplingSummary,
};

use crate::error::{ApiError, ErrorEntry};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSamplingBatchRequest {
    /// Claim administrator performing the review
    pub claim_admin_uuid: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub percentage: i64,
    /// Claim search criteria, as an object or as a JSON-encoded string
    #[serde(default)]
    pub filters: Value,
    #[serde(default)]
    pub task_group: Option<Uuid>,
}

impl CreateSamplingBatchRequest {
    pub fn claim_filter(&self) -> Result<ClaimFilter, ApiError> {
        let document = match &self.filters {
            Value::String(encoded) if encoded.trim().is_empty() => Value::Null,
            Value::String(encoded) => serde_json::from_str(encoded).map_err(invalid_filters)?,
            other => other.clone(),
        };
        ClaimFilter::from_json(document).map_err(invalid_filters)
    }
}

fn invalid_filters(err: serde_json::Error) -> ApiError {
    ApiError::Validation {
        message: "Invalid filters".to_string(),
        detail: Some(err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSamplingBatchRequest {
    pub claim_admin_uuid: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingBatchResponse {
    pub id: Uuid,
    pub batch_no: Option<i64>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub is_completed: bool,
    pub is_applied: bool,
    pub computed_value: Map<String, Value>,
    pub assigned_value: Map<String, Value>,
    pub recorded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SamplingBatch> for SamplingBatchResponse {
    fn from(batch: SamplingBatch) -> Self {
        Self {
            id: batch.id.into(),
            batch_no: batch.batch_no,
            assigned_to: batch.assigned_to.map(Uuid::from),
            created_by: batch.created_by.map(Uuid::from),
            is_completed: batch.is_completed,
            is_applied: batch.is_applied,
            computed_value: batch.computed_value,
            assigned_value: batch.assigned_value,
            recorded_at: batch.system_period.recorded_at,
            updated_at: batch.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchClaimResponse {
    pub assignment_id: Uuid,
    pub assignment_status: AssignmentStatus,
    pub claim_id: Uuid,
    pub code: String,
    pub status: ClaimStatus,
    pub review_status: ReviewStatus,
    pub claimed: Decimal,
    pub adjusted: Decimal,
    pub approved: Option<Decimal>,
}

impl From<BatchClaim> for BatchClaimResponse {
    fn from(entry: BatchClaim) -> Self {
        let adjusted = entry.claim.adjusted_total();
        Self {
            assignment_id: entry.assignment.id.into(),
            assignment_status: entry.assignment.status,
            claim_id: entry.claim.id.into(),
            code: entry.claim.code,
            status: entry.claim.status,
            review_status: entry.claim.review_status,
            claimed: entry.claim.claimed,
            adjusted,
            approved: entry.claim.approved,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingSummaryResponse {
    pub batch_id: Uuid,
    pub total: usize,
    pub reviewed_delivered: Vec<Uuid>,
    pub rejected_from_review: Vec<Uuid>,
}

impl From<SamplingSummary> for SamplingSummaryResponse {
    fn from(summary: SamplingSummary) -> Self {
        let sorted = |ids: std::collections::HashSet<core_kernel::ClaimId>| {
            let mut ids: Vec<Uuid> = ids.into_iter().map(Uuid::from).collect();
            ids.sort();
            ids
        };
        Self {
            batch_id: summary.batch_id.into(),
            total: summary.total,
            reviewed_delivered: sorted(summary.reviewed_delivered),
            rejected_from_review: sorted(summary.rejected_from_review),
        }
    }
}

/// Per-claim errors of an extrapolation; empty when every claim went through
#[derive(Debug, Serialize)]
pub struct ErrorListResponse {
    pub errors: Vec<ErrorEntry>,
}

impl From<Vec<ClaimProcessingError>> for ErrorListResponse {
    fn from(errors: Vec<ClaimProcessingError>) -> Self {
        Self {
            errors: errors
                .into_iter()
                .map(|e| ErrorEntry {
                    message: format!("{}: {}", e.claim_code, e.message),
                    detail: e.detail,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(filters: Value, percentage: i64) -> CreateSamplingBatchRequest {
        serde_json::from_value(json!({
            "claimAdminUuid": Uuid::now_v7(),
            "percentage": percentage,
            "filters": filters,
        }))
        .unwrap()
    }

    #[test]
    fn test_filters_accept_encoded_string() {
        let filter = request(json!("{\"healthFacilityId\": 7}"), 10).claim_filter().unwrap();
        assert_eq!(filter.health_facility_id, Some(7));
    }

    #[test]
    fn test_missing_filters_means_default() {
        let req: CreateSamplingBatchRequest = serde_json::from_value(json!({
            "claimAdminUuid": Uuid::now_v7(),
            "percentage": 10,
        }))
        .unwrap();
        assert_eq!(req.claim_filter().unwrap(), ClaimFilter::default());
    }

    #[test]
    fn test_malformed_filters_are_validation_errors() {
        let err = request(json!("{not json"), 10).claim_filter().unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[test]
    fn test_percentage_range_is_validated() {
        assert!(request(Value::Null, 0).validate().is_err());
        assert!(request(Value::Null, 101).validate().is_err());
        assert!(request(Value::Null, 100).validate().is_ok());
    }

    proptest::proptest! {
        #[test]
        fn prop_percentage_validation_matches_range(percentage in -1000i64..1000) {
            let valid = request(Value::Null, percentage).validate().is_ok();
            proptest::prop_assert_eq!(valid, (1..=100).contains(&percentage));
        }
    }
}
