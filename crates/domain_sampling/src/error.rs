//! Sampling domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the sampling domain
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("No eligible claims: every candidate is missing or already assigned to a sampling batch")]
    NoEligibleClaims,

    #[error("Percentage {0} is out of range, expected a value from 1 to 100")]
    PercentageOutOfRange(i64),

    #[error("Sampling batch not found: {0}")]
    BatchNotFound(String),

    /// Raised instead of dividing by zero when no delivered review exists
    #[error("Deductible ratio undefined for batch {batch_id}: no delivered reviewed claim carries an adjusted amount")]
    DeductibleRatioUndefined { batch_id: String },

    /// Extrapolation already ran; its decisions are kept in `assigned_value`
    #[error("Sampling batch {0} has already been extrapolated")]
    BatchAlreadyApplied(String),

    #[error("Invalid assignment status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error(transparent)]
    Port(#[from] PortError),
}

impl SamplingError {
    /// True for errors caused by the caller's input, raised before any write
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SamplingError::NoEligibleClaims | SamplingError::PercentageOutOfRange(_)
        ) || matches!(self, SamplingError::Port(PortError::Validation { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SamplingError::BatchNotFound(_))
            || matches!(self, SamplingError::Port(e) if e.is_not_found())
    }

    /// Another writer got there first: a claim was assigned concurrently or
    /// the batch was already extrapolated
    pub fn is_conflict(&self) -> bool {
        matches!(self, SamplingError::BatchAlreadyApplied(_))
            || matches!(self, SamplingError::Port(e) if e.is_conflict())
    }
}

impl SamplingError {
    /// Maps a port lookup of a batch, turning `NotFound` into `BatchNotFound`
    pub(crate) fn from_batch_lookup(batch_id: core_kernel::SamplingBatchId, error: PortError) -> Self {
        if error.is_not_found() {
            SamplingError::BatchNotFound(batch_id.to_string())
        } else {
            SamplingError::Port(error)
        }
    }
}
