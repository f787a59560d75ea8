//! Claim Sampling Domain
//!
//! This crate selects a random share of submitted claims for manual review,
//! tracks the review outcome, and extrapolates the observed approval rate onto
//! the claims that were not reviewed.
//!
//! # Sampling Lifecycle
//!
//! ```text
//! candidates -> allocate (IDLE / SKIPPED) -> review task -> reviewers deliver
//!            -> summary -> deductible ratio -> extrapolate onto SKIPPED -> dedrem
//! ```
//!
//! Claims themselves are owned by the claims module. This crate only moves
//! their review status and, during extrapolation, their approved amounts.

pub mod allocation;
pub mod batch;
pub mod claim;
pub mod config;
pub mod error;
pub mod extrapolation;
pub mod filter;
pub mod ports;
pub mod services;
pub mod summary;
pub mod task;

pub use allocation::{RandomAllocator, SampleLabel, DeductibleLabel};
pub use batch::{SamplingBatch, Assignment, AssignmentStatus, BatchClaim};
pub use claim::{Claim, ClaimDetail, ClaimStatus, ReviewStatus, DetailKind, DetailStatus};
pub use config::SamplingConfig;
pub use error::SamplingError;
pub use extrapolation::{DeductibleRatio, ExtrapolationStrategy, ExtrapolationOutcome};
pub use filter::{ClaimFilter, AttachmentStatus};
pub use ports::{
    SamplingStore, SamplingTransaction, ClaimQueryPort, ClaimValuationPort, ClaimIssue,
};
pub use services::{ClaimSamplingService, CreateBatchRequest, ClaimProcessingError};
pub use summary::{SamplingSummary, SamplingSummaryReporter};
pub use task::{TaskBridge, TaskPayload, TaskRef, TaskResolution, TaskStatus};
