//! Pre-built Test Fixtures
//!
//! Ready-to-use claim data. Values are fixed so that totals and ratios in
//! tests can be written down by hand.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::ClaimAdminId;
use domain_sampling::{Claim, ClaimDetail, DetailKind, DetailStatus, ReviewStatus};

use crate::builders::TestClaimBuilder;

/// Fixture for claim test data
pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Health facility used by every fixture claim
    pub const HEALTH_FACILITY_ID: i32 = 17;

    /// First day of service
    pub fn visit_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    /// Day the claim was submitted
    pub fn claim_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    /// A single-unit line at `price`
    pub fn line(id: i64, kind: DetailKind, price: Decimal) -> ClaimDetail {
        ClaimDetail {
            id,
            kind,
            code: match kind {
                DetailKind::Item => format!("IT{id:03}"),
                DetailKind::Service => format!("SV{id:03}"),
            },
            status: DetailStatus::Passed,
            qty_provided: dec!(1),
            qty_approved: None,
            price_asked: price,
            price_adjusted: Some(price),
            price_approved: None,
            rejection_reason: None,
        }
    }

    /// A checked claim worth 100 with one item line, not yet sampled
    pub fn checked_claim(code: &str) -> Claim {
        TestClaimBuilder::new().with_code(code).with_item(dec!(100)).build()
    }

    /// `count` checked claims coded `CLM-0001`, `CLM-0002`, ...
    pub fn checked_claims(count: usize) -> Vec<Claim> {
        (1..=count)
            .map(|n| Self::checked_claim(&format!("CLM-{n:04}")))
            .collect()
    }

    /// A claim a reviewer has delivered with `approved` out of 100
    pub fn delivered_claim(code: &str, approved: Decimal) -> Claim {
        TestClaimBuilder::new()
            .with_code(code)
            .with_item(dec!(100))
            .with_review_status(ReviewStatus::Delivered)
            .with_approved_prices(approved)
            .build()
    }

    pub fn admin_id() -> ClaimAdminId {
        ClaimAdminId::new_v7()
    }
}
