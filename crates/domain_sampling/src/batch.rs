//! Sampling batch and per-claim assignments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use core_kernel::{AssignmentId, ClaimAdminId, ClaimId, SamplingBatchId, SystemPeriod, UserId};

use crate::allocation::SampleLabel;
use crate::claim::Claim;
use crate::error::SamplingError;

/// One sampling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingBatch {
    pub id: SamplingBatchId,
    /// Database-assigned surrogate number, set once persisted
    pub batch_no: Option<i64>,
    /// Claim administrator performing the manual review
    pub assigned_to: Option<ClaimAdminId>,
    pub created_by: Option<UserId>,
    pub is_completed: bool,
    pub is_applied: bool,
    /// Cached review summary
    pub computed_value: Map<String, Value>,
    /// Cached extrapolation decisions
    pub assigned_value: Map<String, Value>,
    pub system_period: SystemPeriod,
    pub updated_at: DateTime<Utc>,
}

impl SamplingBatch {
    pub fn new(assigned_to: Option<ClaimAdminId>, created_by: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: SamplingBatchId::new_v7(),
            batch_no: None,
            assigned_to,
            created_by,
            is_completed: false,
            is_applied: false,
            computed_value: Map::new(),
            assigned_value: Map::new(),
            system_period: SystemPeriod::recorded_at(now),
            updated_at: now,
        }
    }

    pub fn is_current(&self) -> bool {
        self.system_period.is_current()
    }

    pub fn reassign(&mut self, assigned_to: Option<ClaimAdminId>) {
        self.assigned_to = assigned_to;
        self.touch();
    }

    /// All manual reviews are in; caches the review summary
    pub fn mark_completed(&mut self, summary: Map<String, Value>) {
        self.is_completed = true;
        self.computed_value = summary;
        self.touch();
    }

    /// Extrapolation has been written to the unreviewed claims
    pub fn mark_applied(&mut self, decisions: Map<String, Value>) {
        self.is_applied = true;
        self.assigned_value = decisions;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Review status of a claim within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    /// Selected for manual review
    Idle,
    /// Left out of review, subject to extrapolation
    Skipped,
    Reviewed,
}

impl AssignmentStatus {
    /// Single-letter storage code
    pub fn code(&self) -> &'static str {
        match self {
            AssignmentStatus::Idle => "I",
            AssignmentStatus::Skipped => "S",
            AssignmentStatus::Reviewed => "R",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(AssignmentStatus::Idle),
            "S" => Some(AssignmentStatus::Skipped),
            "R" => Some(AssignmentStatus::Reviewed),
            _ => None,
        }
    }

    /// Only a pending review can be closed
    pub fn can_transition_to(&self, target: AssignmentStatus) -> bool {
        matches!((self, target), (AssignmentStatus::Idle, AssignmentStatus::Reviewed))
    }
}

impl From<SampleLabel> for AssignmentStatus {
    fn from(label: SampleLabel) -> Self {
        match label {
            SampleLabel::Selected => AssignmentStatus::Idle,
            SampleLabel::NotSelected => AssignmentStatus::Skipped,
        }
    }
}

/// Links one claim to one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub batch_id: SamplingBatchId,
    pub claim_id: ClaimId,
    pub status: AssignmentStatus,
    pub system_period: SystemPeriod,
}

impl Assignment {
    pub fn new(batch_id: SamplingBatchId, claim_id: ClaimId, label: SampleLabel) -> Self {
        Self {
            id: AssignmentId::new_v7(),
            batch_id,
            claim_id,
            status: label.into(),
            system_period: SystemPeriod::current(),
        }
    }

    pub fn mark_reviewed(&mut self) -> Result<(), SamplingError> {
        if !self.status.can_transition_to(AssignmentStatus::Reviewed) {
            return Err(SamplingError::InvalidStatusTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", AssignmentStatus::Reviewed),
            });
        }
        self.status = AssignmentStatus::Reviewed;
        Ok(())
    }
}

/// A claim together with its assignment in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchClaim {
    pub assignment: Assignment,
    pub claim: Claim,
}
