//! Deductible ratio and extrapolation outcome
//!
//! The ratio is the observed approval rate of the manually reviewed claims,
//! taken over aggregate sums:
//!
//! ```text
//! ratio = sum(approved item + service totals) / sum(adjusted item + service totals)
//! ```
//!
//! over the batch claims whose review was delivered. It is never an average
//! of per-claim ratios.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use core_kernel::{ClaimId, SamplingBatchId};

use crate::batch::{AssignmentStatus, BatchClaim};
use crate::claim::{Claim, ReviewStatus};
use crate::error::SamplingError;

/// How the ratio is carried onto unreviewed claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationStrategy {
    /// Scale every unreviewed claim's approved amounts by the ratio
    #[default]
    Deduction,
    /// Approve a ratio-sized share of unreviewed claims in full, reject the rest
    Rejection,
}

/// Approval rate observed among delivered reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductibleRatio {
    approved: Decimal,
    adjusted: Decimal,
    value: Decimal,
    reviewed: usize,
}

impl DeductibleRatio {
    /// Computes the ratio over the delivered claims of a batch
    ///
    /// Fails with [`SamplingError::DeductibleRatioUndefined`] when there is
    /// no delivered claim or their adjusted total is zero.
    pub fn from_reviewed<'a, I>(batch_id: SamplingBatchId, claims: I) -> Result<Self, SamplingError>
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        let mut approved = Decimal::ZERO;
        let mut adjusted = Decimal::ZERO;
        let mut reviewed = 0;
        for claim in claims.into_iter().filter(|c| c.review_status == ReviewStatus::Delivered) {
            approved += claim.approved_total();
            adjusted += claim.adjusted_total();
            reviewed += 1;
        }

        let value = approved
            .checked_div(adjusted)
            .ok_or_else(|| SamplingError::DeductibleRatioUndefined {
                batch_id: batch_id.to_string(),
            })?;

        Ok(Self { approved, adjusted, value, reviewed })
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn approved_total(&self) -> Decimal {
        self.approved
    }

    pub fn adjusted_total(&self) -> Decimal {
        self.adjusted
    }

    /// Number of delivered claims the ratio was computed from
    pub fn reviewed_count(&self) -> usize {
        self.reviewed
    }
}

/// Skipped claims whose review status was never touched
pub fn is_extrapolation_target(entry: &BatchClaim) -> bool {
    entry.assignment.status == AssignmentStatus::Skipped && entry.claim.review_status.is_untouched()
}

/// Decisions written by one extrapolation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationOutcome {
    pub strategy: ExtrapolationStrategy,
    pub ratio: Decimal,
    pub targets: usize,
    pub approved: Vec<ClaimId>,
    pub rejected: Vec<ClaimId>,
}

impl ExtrapolationOutcome {
    pub fn new(strategy: ExtrapolationStrategy, ratio: Decimal) -> Self {
        Self { strategy, ratio, targets: 0, approved: Vec::new(), rejected: Vec::new() }
    }

    /// Representation cached on the batch
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("strategy".into(), json!(self.strategy));
        map.insert("ratio".into(), json!(self.ratio.to_string()));
        map.insert("targets".into(), json!(self.targets));
        map.insert("approved".into(), json!(self.approved));
        map.insert("rejected".into(), json!(self.rejected));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimDetail, ClaimStatus, DetailKind, DetailStatus};
    use chrono::NaiveDate;
    use core_kernel::SystemPeriod;
    use rust_decimal_macros::dec;

    fn reviewed(status: ClaimStatus, review: ReviewStatus, adjusted: Decimal, approved: Decimal) -> Claim {
        Claim {
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
            claimed: adjusted,
            approved: None,
            attachments_count: 0,
            restored_from: None,
            items: vec![ClaimDetail {
                id: 1,
                kind: DetailKind::Item,
                code: "I1".to_string(),
                status: DetailStatus::Passed,
                qty_provided: Decimal::ONE,
                qty_approved: None,
                price_asked: adjusted,
                price_adjusted: None,
                price_approved: Some(approved),
                rejection_reason: None,
            }],
            services: vec![],
            system_period: SystemPeriod::current(),
        }
    }

    #[test]
    fn test_ratio_from_aggregate_sums() {
        let claims = vec![
            reviewed(ClaimStatus::Processed, ReviewStatus::Delivered, dec!(100), dec!(90)),
            reviewed(ClaimStatus::Processed, ReviewStatus::Delivered, dec!(300), dec!(110)),
            reviewed(ClaimStatus::Checked, ReviewStatus::Idle, dec!(1000), dec!(0)),
        ];
        let ratio = DeductibleRatio::from_reviewed(SamplingBatchId::new_v7(), &claims).unwrap();
        assert_eq!(ratio.value(), dec!(0.5));
        assert_eq!(ratio.reviewed_count(), 2);
        assert_eq!(ratio.adjusted_total(), dec!(400));
    }

    #[test]
    fn test_rejected_review_counts_in_denominator_only() {
        let claims = vec![
            reviewed(ClaimStatus::Rejected, ReviewStatus::Delivered, dec!(100), dec!(100)),
            reviewed(ClaimStatus::Processed, ReviewStatus::Delivered, dec!(100), dec!(100)),
        ];
        let ratio = DeductibleRatio::from_reviewed(SamplingBatchId::new_v7(), &claims).unwrap();
        assert_eq!(ratio.value(), dec!(0.5));
    }

    #[test]
    fn test_no_delivered_review_is_undefined() {
        let claims = vec![reviewed(ClaimStatus::Checked, ReviewStatus::Selected, dec!(100), dec!(50))];
        let result = DeductibleRatio::from_reviewed(SamplingBatchId::new_v7(), &claims);
        assert!(matches!(result, Err(SamplingError::DeductibleRatioUndefined { .. })));
    }

    #[test]
    fn test_zero_adjusted_total_is_undefined() {
        let claims = vec![reviewed(ClaimStatus::Processed, ReviewStatus::Delivered, dec!(0), dec!(0))];
        let result = DeductibleRatio::from_reviewed(SamplingBatchId::new_v7(), &claims);
        assert!(matches!(result, Err(SamplingError::DeductibleRatioUndefined { .. })));
    }
}
