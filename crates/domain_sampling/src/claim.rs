//! Claim view
//!
//! Claims are owned by the claims module. Sampling reads their valuation and
//! writes back only the review status and, during extrapolation, the approved
//! amounts of the claim and its detail lines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimAdminId, ClaimId, SystemPeriod};

/// Integer code or symbolic name, as carried by claim search filters
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CodeOrName {
    Code(i16),
    Name(String),
}

/// Claim processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "CodeOrName")]
pub enum ClaimStatus {
    Rejected,
    Entered,
    Checked,
    Processed,
    Valuated,
}

impl ClaimStatus {
    /// Stored integer code
    pub fn code(&self) -> i16 {
        match self {
            ClaimStatus::Rejected => 1,
            ClaimStatus::Entered => 2,
            ClaimStatus::Checked => 4,
            ClaimStatus::Processed => 8,
            ClaimStatus::Valuated => 16,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(ClaimStatus::Rejected),
            2 => Some(ClaimStatus::Entered),
            4 => Some(ClaimStatus::Checked),
            8 => Some(ClaimStatus::Processed),
            16 => Some(ClaimStatus::Valuated),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "REJECTED" => Some(ClaimStatus::Rejected),
            "ENTERED" => Some(ClaimStatus::Entered),
            "CHECKED" => Some(ClaimStatus::Checked),
            "PROCESSED" => Some(ClaimStatus::Processed),
            "VALUATED" => Some(ClaimStatus::Valuated),
            _ => None,
        }
    }
}

impl TryFrom<CodeOrName> for ClaimStatus {
    type Error = String;

    fn try_from(value: CodeOrName) -> Result<Self, Self::Error> {
        match value {
            CodeOrName::Code(code) => {
                Self::from_code(code).ok_or_else(|| format!("unknown claim status code {code}"))
            }
            CodeOrName::Name(name) => {
                Self::from_name(&name).ok_or_else(|| format!("unknown claim status {name}"))
            }
        }
    }
}

/// Manual review status of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "CodeOrName")]
pub enum ReviewStatus {
    /// Never considered for review
    Idle,
    NotSelected,
    /// Chosen for manual review
    Selected,
    /// Review delivered by the claim administrator
    Delivered,
    /// Valuated by extrapolation instead of review
    Bypassed,
}

impl ReviewStatus {
    pub fn code(&self) -> i16 {
        match self {
            ReviewStatus::Idle => 1,
            ReviewStatus::NotSelected => 2,
            ReviewStatus::Selected => 4,
            ReviewStatus::Delivered => 8,
            ReviewStatus::Bypassed => 16,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(ReviewStatus::Idle),
            2 => Some(ReviewStatus::NotSelected),
            4 => Some(ReviewStatus::Selected),
            8 => Some(ReviewStatus::Delivered),
            16 => Some(ReviewStatus::Bypassed),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "IDLE" => Some(ReviewStatus::Idle),
            "NOT_SELECTED" => Some(ReviewStatus::NotSelected),
            "SELECTED" => Some(ReviewStatus::Selected),
            "DELIVERED" => Some(ReviewStatus::Delivered),
            "BYPASSED" => Some(ReviewStatus::Bypassed),
            _ => None,
        }
    }

    /// Initial states that sampling is allowed to overwrite
    pub fn is_untouched(&self) -> bool {
        matches!(self, ReviewStatus::Idle | ReviewStatus::NotSelected)
    }
}

impl TryFrom<CodeOrName> for ReviewStatus {
    type Error = String;

    fn try_from(value: CodeOrName) -> Result<Self, Self::Error> {
        match value {
            CodeOrName::Code(code) => {
                Self::from_code(code).ok_or_else(|| format!("unknown review status code {code}"))
            }
            CodeOrName::Name(name) => {
                Self::from_name(&name).ok_or_else(|| format!("unknown review status {name}"))
            }
        }
    }
}

/// Detail line kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Item,
    Service,
}

/// Detail line review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailStatus {
    Passed,
    Rejected,
}

impl DetailStatus {
    pub fn code(&self) -> i16 {
        match self {
            DetailStatus::Passed => 1,
            DetailStatus::Rejected => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(DetailStatus::Passed),
            2 => Some(DetailStatus::Rejected),
            _ => None,
        }
    }
}

/// A medical item or service line of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDetail {
    pub id: i64,
    pub kind: DetailKind,
    /// Item or service code
    pub code: String,
    pub status: DetailStatus,
    pub qty_provided: Decimal,
    pub qty_approved: Option<Decimal>,
    pub price_asked: Decimal,
    pub price_adjusted: Option<Decimal>,
    pub price_approved: Option<Decimal>,
    pub rejection_reason: Option<i16>,
}

impl ClaimDetail {
    /// Approved quantity, falling back to the provided quantity
    pub fn quantity(&self) -> Decimal {
        self.qty_approved.unwrap_or(self.qty_provided)
    }

    /// Adjusted unit price, falling back to the asked price
    pub fn adjusted_price(&self) -> Decimal {
        self.price_adjusted.unwrap_or(self.price_asked)
    }

    pub fn is_rejected(&self) -> bool {
        self.status == DetailStatus::Rejected || self.rejection_reason.is_some_and(|r| r != 0)
    }

    /// Line total at the adjusted price
    pub fn adjusted_value(&self) -> Decimal {
        self.adjusted_price() * self.quantity()
    }

    /// Line total at the approved price; zero for a rejected line
    pub fn approved_value(&self) -> Decimal {
        if self.is_rejected() {
            return Decimal::ZERO;
        }
        self.price_approved.unwrap_or_else(|| self.adjusted_price()) * self.quantity()
    }
}

/// Claim as seen by the sampling module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub code: String,
    pub status: ClaimStatus,
    pub review_status: ReviewStatus,
    pub health_facility_id: Option<i32>,
    pub insuree_id: Option<i32>,
    pub admin_id: Option<ClaimAdminId>,
    pub care_type: Option<String>,
    pub visit_type: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
    pub date_claimed: NaiveDate,
    /// Amount claimed by the health facility
    pub claimed: Decimal,
    /// Amount approved for payment
    pub approved: Option<Decimal>,
    pub attachments_count: u32,
    /// Claim this one was restored from
    pub restored_from: Option<ClaimId>,
    pub items: Vec<ClaimDetail>,
    pub services: Vec<ClaimDetail>,
    pub system_period: SystemPeriod,
}

impl Claim {
    pub fn details(&self) -> impl Iterator<Item = &ClaimDetail> {
        self.items.iter().chain(self.services.iter())
    }

    fn details_mut(&mut self) -> impl Iterator<Item = &mut ClaimDetail> {
        self.items.iter_mut().chain(self.services.iter_mut())
    }

    /// Adjusted item total plus adjusted service total
    pub fn adjusted_total(&self) -> Decimal {
        self.details().map(ClaimDetail::adjusted_value).sum()
    }

    /// Approved item total plus approved service total; zero for a rejected claim
    pub fn approved_total(&self) -> Decimal {
        if self.status == ClaimStatus::Rejected {
            return Decimal::ZERO;
        }
        self.details().map(ClaimDetail::approved_value).sum()
    }

    pub fn is_current(&self) -> bool {
        self.system_period.is_current()
    }

    /// Marks the claim for manual review when it has not been touched yet
    pub fn select_for_review(&mut self) -> bool {
        if self.review_status.is_untouched() {
            self.review_status = ReviewStatus::Selected;
            true
        } else {
            false
        }
    }

    pub fn bypass_review(&mut self) {
        self.review_status = ReviewStatus::Bypassed;
    }

    /// Scales the claim and every line by `ratio`, rounding to `scale` places
    pub fn apply_deduction(&mut self, ratio: Decimal, scale: u32) {
        self.approved = Some((ratio * self.adjusted_total()).round_dp(scale));
        for detail in self.details_mut() {
            detail.price_approved = Some((ratio * detail.adjusted_price()).round_dp(scale));
        }
    }

    /// Approves the adjusted valuation as is
    pub fn approve_in_full(&mut self, scale: u32) {
        self.approved = Some(self.adjusted_total().round_dp(scale));
        for detail in self.details_mut() {
            detail.price_approved = Some(detail.adjusted_price());
        }
    }

    pub fn reject_in_full(&mut self) {
        self.status = ClaimStatus::Rejected;
        self.approved = Some(Decimal::ZERO);
        for detail in self.details_mut() {
            detail.price_approved = Some(Decimal::ZERO);
        }
    }
}
