//! Test Data Builders
//!
//! Provides builder patterns for constructing test claims with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{ClaimAdminId, ClaimId, SystemPeriod};
use domain_sampling::{Claim, ClaimDetail, ClaimStatus, DetailKind, ReviewStatus};

use crate::fixtures::ClaimFixtures;

/// Builder for constructing test claims
pub struct TestClaimBuilder {
    id: ClaimId,
    code: String,
    status: ClaimStatus,
    review_status: ReviewStatus,
    health_facility_id: Option<i32>,
    admin_id: Option<ClaimAdminId>,
    date_from: NaiveDate,
    date_claimed: NaiveDate,
    attachments_count: u32,
    restored_from: Option<ClaimId>,
    items: Vec<ClaimDetail>,
    services: Vec<ClaimDetail>,
    approved_prices: Option<Decimal>,
    next_line_id: i64,
}

impl Default for TestClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClaimBuilder {
    /// Creates a new builder: a checked, untouched claim without lines
    pub fn new() -> Self {
        Self {
            id: ClaimId::new_v7(),
            code: "CLM-0001".to_string(),
            status: ClaimStatus::Checked,
            review_status: ReviewStatus::Idle,
            health_facility_id: Some(ClaimFixtures::HEALTH_FACILITY_ID),
            admin_id: None,
            date_from: ClaimFixtures::visit_date(),
            date_claimed: ClaimFixtures::claim_date(),
            attachments_count: 0,
            restored_from: None,
            items: Vec::new(),
            services: Vec::new(),
            approved_prices: None,
            next_line_id: 1,
        }
    }

    pub fn with_id(mut self, id: ClaimId) -> Self {
        self.id = id;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_review_status(mut self, review_status: ReviewStatus) -> Self {
        self.review_status = review_status;
        self
    }

    pub fn with_health_facility(mut self, id: i32) -> Self {
        self.health_facility_id = Some(id);
        self
    }

    pub fn with_admin(mut self, admin_id: ClaimAdminId) -> Self {
        self.admin_id = Some(admin_id);
        self
    }

    pub fn with_date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = date;
        self
    }

    pub fn with_attachments(mut self, count: u32) -> Self {
        self.attachments_count = count;
        self
    }

    /// Marks the claim as restored from `original`
    pub fn with_restored_from(mut self, original: ClaimId) -> Self {
        self.restored_from = Some(original);
        self
    }

    /// Adds a one-unit item line adjusted to `price`
    pub fn with_item(mut self, price: Decimal) -> Self {
        let line = ClaimFixtures::line(self.next_line_id, DetailKind::Item, price);
        self.next_line_id += 1;
        self.items.push(line);
        self
    }

    /// Adds a one-unit service line adjusted to `price`
    pub fn with_service(mut self, price: Decimal) -> Self {
        let line = ClaimFixtures::line(self.next_line_id, DetailKind::Service, price);
        self.next_line_id += 1;
        self.services.push(line);
        self
    }

    /// Spreads an approved total over the lines, pro rata to their adjusted value
    pub fn with_approved_prices(mut self, approved_total: Decimal) -> Self {
        self.approved_prices = Some(approved_total);
        self
    }

    /// Builds the claim
    pub fn build(self) -> Claim {
        let mut claim = Claim {
            id: self.id,
            code: self.code,
            status: self.status,
            review_status: self.review_status,
            health_facility_id: self.health_facility_id,
            insuree_id: None,
            admin_id: self.admin_id,
            care_type: None,
            visit_type: None,
            date_from: self.date_from,
            date_to: None,
            date_claimed: self.date_claimed,
            claimed: Decimal::ZERO,
            approved: None,
            attachments_count: self.attachments_count,
            restored_from: self.restored_from,
            items: self.items,
            services: self.services,
            system_period: SystemPeriod::current(),
        };
        claim.claimed = claim.adjusted_total();

        if let Some(approved_total) = self.approved_prices {
            let adjusted = claim.adjusted_total();
            if adjusted > Decimal::ZERO {
                let ratio = approved_total / adjusted;
                claim.apply_deduction(ratio, 2);
            }
        }
        claim
    }
}
