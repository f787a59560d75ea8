//! Candidate claim filter
//!
//! The batch creation request carries the claim search criteria as an opaque
//! JSON document. Keys are accepted in camelCase or snake_case.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::ClaimAdminId;

use crate::claim::{Claim, ClaimStatus, ReviewStatus};

/// Attachment presence criterion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AttachmentStatus {
    #[default]
    Any,
    With,
    Without,
}

impl TryFrom<u8> for AttachmentStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AttachmentStatus::Any),
            1 => Ok(AttachmentStatus::With),
            2 => Ok(AttachmentStatus::Without),
            other => Err(format!("unknown attachment status {other}")),
        }
    }
}

impl From<AttachmentStatus> for u8 {
    fn from(value: AttachmentStatus) -> Self {
        match value {
            AttachmentStatus::Any => 0,
            AttachmentStatus::With => 1,
            AttachmentStatus::Without => 2,
        }
    }
}

/// Business criteria selecting candidate claims
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaimFilter {
    pub status: Option<ClaimStatus>,
    #[serde(alias = "review_status")]
    pub review_status: Option<ReviewStatus>,
    #[serde(alias = "health_facility_id")]
    pub health_facility_id: Option<i32>,
    #[serde(alias = "admin_id")]
    pub admin_id: Option<ClaimAdminId>,
    #[serde(alias = "insuree_id")]
    pub insuree_id: Option<i32>,
    #[serde(alias = "care_type")]
    pub care_type: Option<String>,
    #[serde(alias = "visit_type")]
    pub visit_type: Option<String>,
    /// Claims starting on or after this date
    #[serde(alias = "date_from")]
    pub date_from: Option<NaiveDate>,
    /// Claims ending on or before this date
    #[serde(alias = "date_to")]
    pub date_to: Option<NaiveDate>,
    #[serde(alias = "date_claimed_from")]
    pub date_claimed_from: Option<NaiveDate>,
    #[serde(alias = "date_claimed_to")]
    pub date_claimed_to: Option<NaiveDate>,
    /// Claims containing at least one of these item codes
    #[serde(alias = "item_codes")]
    pub item_codes: Vec<String>,
    #[serde(alias = "service_codes")]
    pub service_codes: Vec<String>,
    #[serde(alias = "attachment_status")]
    pub attachment_status: AttachmentStatus,
    #[serde(alias = "code_is_not")]
    pub code_is_not: Option<String>,
    /// Only claims that were restored from another claim
    #[serde(alias = "show_restored")]
    pub show_restored: bool,
}

impl ClaimFilter {
    /// Parses the filter from the request's JSON document
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }

    /// Evaluates the filter against a single claim
    pub fn matches(&self, claim: &Claim) -> bool {
        if !claim.is_current() {
            return false;
        }
        if self.status.is_some_and(|s| s != claim.status) {
            return false;
        }
        if self.review_status.is_some_and(|s| s != claim.review_status) {
            return false;
        }
        if self.health_facility_id.is_some() && self.health_facility_id != claim.health_facility_id {
            return false;
        }
        if self.admin_id.is_some() && self.admin_id != claim.admin_id {
            return false;
        }
        if self.insuree_id.is_some() && self.insuree_id != claim.insuree_id {
            return false;
        }
        if self.care_type.is_some() && self.care_type != claim.care_type {
            return false;
        }
        if self.visit_type.is_some() && self.visit_type != claim.visit_type {
            return false;
        }
        if self.date_from.is_some_and(|d| claim.date_from < d) {
            return false;
        }
        let claim_end = claim.date_to.unwrap_or(claim.date_from);
        if self.date_to.is_some_and(|d| claim_end > d) {
            return false;
        }
        if self.date_claimed_from.is_some_and(|d| claim.date_claimed < d) {
            return false;
        }
        if self.date_claimed_to.is_some_and(|d| claim.date_claimed > d) {
            return false;
        }
        if !self.item_codes.is_empty()
            && !claim.items.iter().any(|i| self.item_codes.contains(&i.code))
        {
            return false;
        }
        if !self.service_codes.is_empty()
            && !claim.services.iter().any(|s| self.service_codes.contains(&s.code))
        {
            return false;
        }
        match self.attachment_status {
            AttachmentStatus::With if claim.attachments_count == 0 => return false,
            AttachmentStatus::Without if claim.attachments_count > 0 => return false,
            _ => {}
        }
        if self.code_is_not.as_deref().is_some_and(|c| c == claim.code) {
            return false;
        }
        if self.show_restored && claim.restored_from.is_none() {
            return false;
        }
        true
    }
}
