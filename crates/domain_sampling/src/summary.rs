//! Review statistics of a batch

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::instrument;

use core_kernel::{ClaimId, SamplingBatchId};

use crate::batch::BatchClaim;
use crate::claim::{ClaimStatus, ReviewStatus};
use crate::error::SamplingError;
use crate::extrapolation::DeductibleRatio;
use crate::ports::SamplingStore;

/// Outcome of the manual reviews of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSummary {
    pub batch_id: SamplingBatchId,
    /// Delivered reviews that rejected the claim
    pub rejected_from_review: HashSet<ClaimId>,
    pub reviewed_delivered: HashSet<ClaimId>,
    /// Number of delivered reviews
    pub total: usize,
}

impl SamplingSummary {
    pub fn from_batch_claims(batch_id: SamplingBatchId, claims: &[BatchClaim]) -> Self {
        let delivered: Vec<_> = claims
            .iter()
            .map(|entry| &entry.claim)
            .filter(|claim| claim.review_status == ReviewStatus::Delivered)
            .collect();

        let rejected_from_review = delivered
            .iter()
            .filter(|claim| claim.status == ClaimStatus::Rejected)
            .map(|claim| claim.id)
            .collect();
        let reviewed_delivered: HashSet<ClaimId> = delivered.iter().map(|claim| claim.id).collect();

        Self {
            batch_id,
            rejected_from_review,
            total: reviewed_delivered.len(),
            reviewed_delivered,
        }
    }

    /// Representation cached on a completed batch
    pub fn to_map(&self, ratio: Option<&DeductibleRatio>) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("rejected_from_review".into(), json!(self.rejected_from_review.len()));
        map.insert("reviewed_delivered".into(), json!(self.reviewed_delivered.len()));
        map.insert("total".into(), json!(self.total));
        if let Some(ratio) = ratio {
            map.insert("deductible_ratio".into(), json!(ratio.value().to_string()));
        }
        map
    }
}

/// Read-side aggregation over a batch
pub struct SamplingSummaryReporter {
    store: Arc<dyn SamplingStore>,
}

impl SamplingSummaryReporter {
    pub fn new(store: Arc<dyn SamplingStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn prepare_sampling_summary(
        &self,
        batch_id: SamplingBatchId,
    ) -> Result<SamplingSummary, SamplingError> {
        self.store
            .get_batch(batch_id)
            .await
            .map_err(|e| SamplingError::from_batch_lookup(batch_id, e))?;
        let claims = self.store.batch_claims(batch_id).await?;
        Ok(SamplingSummary::from_batch_claims(batch_id, &claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::SampleLabel;
    use crate::batch::Assignment;
    use crate::claim::Claim;
    use chrono::NaiveDate;
    use core_kernel::SystemPeriod;
    use rust_decimal::Decimal;

    fn entry(batch_id: SamplingBatchId, status: ClaimStatus, review: ReviewStatus) -> BatchClaim {
        let claim = Claim {
            id: ClaimId::new_v7(),
            code: "C".to_string(),
            status,
            review_status: review,
            health_facility_id: None,
            insuree_id: None,
            admin_id: None,
            care_type: None,
            visit_type: None,
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            date_to: None,
            date_claimed: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            claimed: Decimal::ZERO,
            approved: None,
            attachments_count: 0,
            restored_from: None,
            items: vec![],
            services: vec![],
            system_period: SystemPeriod::current(),
        };
        BatchClaim {
            assignment: Assignment::new(batch_id, claim.id, SampleLabel::Selected),
            claim,
        }
    }

    #[test]
    fn test_only_delivered_reviews_count() {
        let batch_id = SamplingBatchId::new_v7();
        let entries = vec![
            entry(batch_id, ClaimStatus::Rejected, ReviewStatus::Delivered),
            entry(batch_id, ClaimStatus::Checked, ReviewStatus::Delivered),
            entry(batch_id, ClaimStatus::Rejected, ReviewStatus::Selected),
            entry(batch_id, ClaimStatus::Checked, ReviewStatus::Idle),
        ];

        let summary = SamplingSummary::from_batch_claims(batch_id, &entries);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.rejected_from_review.len(), 1);
        assert!(summary.rejected_from_review.contains(&entries[0].claim.id));
        assert!(!summary.reviewed_delivered.contains(&entries[2].claim.id));
    }

    #[test]
    fn test_map_without_ratio() {
        let summary = SamplingSummary::from_batch_claims(SamplingBatchId::new_v7(), &[]);
        let map = summary.to_map(None);
        assert_eq!(map["total"], 0);
        assert!(!map.contains_key("deductible_ratio"));
    }
}
