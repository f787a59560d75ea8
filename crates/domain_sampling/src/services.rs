//! Claim sampling service
//!
//! Orchestrates batch creation, review tracking and extrapolation. Every
//! write of an operation goes through one [`SamplingTransaction`]; an error
//! before commit leaves nothing behind.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    ClaimAdminId, ClaimId, OperationMetadata, PortError, SamplingBatchId, TaskGroupId, UserId,
};

use crate::allocation::{DeductibleLabel, RandomAllocator};
use crate::batch::{Assignment, AssignmentStatus, BatchClaim, SamplingBatch};
use crate::claim::{Claim, ClaimStatus, ReviewStatus};
use crate::config::SamplingConfig;
use crate::error::SamplingError;
use crate::extrapolation::{
    is_extrapolation_target, DeductibleRatio, ExtrapolationOutcome, ExtrapolationStrategy,
};
use crate::filter::ClaimFilter;
use crate::ports::{ClaimIssue, ClaimQueryPort, ClaimValuationPort, SamplingStore};
use crate::summary::{SamplingSummary, SamplingSummaryReporter};
use crate::task::{TaskBridge, TaskResolution};

/// Request to create a sampling batch
#[derive(Debug, Clone, Default)]
pub struct CreateBatchRequest {
    /// Share of candidates to review, from 1 to 100
    pub percentage: i64,
    pub candidates: Vec<ClaimId>,
    pub assigned_to: Option<ClaimAdminId>,
    pub task_group: Option<TaskGroupId>,
    pub requested_by: Option<UserId>,
}

/// Non-fatal per-claim failure collected during extrapolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimProcessingError {
    pub claim_id: ClaimId,
    pub claim_code: String,
    pub message: String,
    pub detail: Option<String>,
}

impl ClaimProcessingError {
    fn from_issue(claim: &Claim, issue: ClaimIssue) -> Self {
        Self {
            claim_id: claim.id,
            claim_code: claim.code.clone(),
            message: issue.message,
            detail: Some(issue.code),
        }
    }

    fn from_port(claim: &Claim, error: &PortError) -> Self {
        Self {
            claim_id: claim.id,
            claim_code: claim.code.clone(),
            message: "Claim processing failed".to_string(),
            detail: Some(error.to_string()),
        }
    }
}

fn validate_percentage(percentage: i64) -> Result<u32, SamplingError> {
    if (1..=100).contains(&percentage) {
        Ok(percentage as u32)
    } else {
        Err(SamplingError::PercentageOutOfRange(percentage))
    }
}

fn distinct(ids: Vec<ClaimId>) -> Vec<ClaimId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn operation_metadata(batch_id: SamplingBatchId, user: Option<UserId>) -> OperationMetadata {
    let metadata = OperationMetadata::with_correlation_id(batch_id.to_string());
    match user {
        Some(user) => metadata.initiated_by(user.to_string()),
        None => metadata,
    }
}

/// Claim sampling application service
pub struct ClaimSamplingService {
    store: Arc<dyn SamplingStore>,
    claims: Arc<dyn ClaimQueryPort>,
    valuation: Arc<dyn ClaimValuationPort>,
    reporter: SamplingSummaryReporter,
    allocator: RandomAllocator,
    task_bridge: TaskBridge,
    config: SamplingConfig,
}

impl ClaimSamplingService {
    pub fn new(
        store: Arc<dyn SamplingStore>,
        claims: Arc<dyn ClaimQueryPort>,
        valuation: Arc<dyn ClaimValuationPort>,
        config: SamplingConfig,
    ) -> Self {
        Self {
            reporter: SamplingSummaryReporter::new(store.clone()),
            allocator: RandomAllocator::from_seed_option(config.random_seed),
            task_bridge: TaskBridge::new(config.task_source.clone()),
            store,
            claims,
            valuation,
            config,
        }
    }

    /// Replaces the random source
    pub fn with_allocator(mut self, allocator: RandomAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Creates a sampling batch over the candidate claims
    ///
    /// Claims already assigned to any batch are dropped from the candidates.
    /// The batch, its assignments, the review status of the selected claims
    /// and the review task are committed together.
    #[instrument(skip(self, request), fields(percentage = request.percentage, candidates = request.candidates.len()))]
    pub async fn create(&self, request: CreateBatchRequest) -> Result<SamplingBatch, SamplingError> {
        let candidates = distinct(request.candidates);
        let mut tx = self.store.begin().await?;

        let locked = tx.lock_claims(&candidates).await?;
        let locked_ids: Vec<ClaimId> = locked.iter().map(|claim| claim.id).collect();
        let assigned = tx.assigned_claim_ids(&locked_ids).await?;
        let mut eligible: Vec<Claim> = locked
            .into_iter()
            .filter(|claim| !assigned.contains(&claim.id))
            .collect();
        if eligible.is_empty() {
            return Err(SamplingError::NoEligibleClaims);
        }
        debug!(eligible = eligible.len(), excluded = assigned.len(), "Candidates filtered");

        let percentage = validate_percentage(request.percentage)?;

        let mut batch = SamplingBatch::new(request.assigned_to, request.requested_by);
        batch.batch_no = Some(tx.insert_batch(&batch).await?);

        let labels = self.allocator.allocate(eligible.len(), percentage);
        let mut assignments = Vec::with_capacity(eligible.len());
        for (claim, label) in eligible.iter_mut().zip(labels) {
            let assignment = Assignment::new(batch.id, claim.id, label);
            if assignment.status == AssignmentStatus::Idle && claim.select_for_review() {
                tx.set_review_status(claim.id, claim.review_status).await?;
            }
            assignments.push(assignment);
        }
        tx.insert_assignments(&assignments).await?;

        let task = self
            .task_bridge
            .create_review_task(
                &mut *tx,
                &batch,
                &eligible,
                request.requested_by,
                request.task_group,
            )
            .await?;

        tx.commit().await?;

        let selected = assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Idle)
            .count();
        info!(
            batch_id = %batch.id,
            batch_no = ?batch.batch_no,
            selected,
            skipped = assignments.len() - selected,
            task_id = %task.id,
            "Sampling batch created"
        );
        Ok(batch)
    }

    /// Creates a sampling batch over the claims matching `filter`
    ///
    /// The candidates of `request` are replaced by the search result.
    #[instrument(skip(self, filter, request), fields(percentage = request.percentage))]
    pub async fn create_from_filter(
        &self,
        filter: &ClaimFilter,
        mut request: CreateBatchRequest,
    ) -> Result<SamplingBatch, SamplingError> {
        let metadata = request
            .requested_by
            .map(|user| OperationMetadata::default().initiated_by(user.to_string()));
        let claims = self.claims.find_claims(filter, metadata).await?;
        debug!(found = claims.len(), "Candidate claims found");
        request.candidates = claims.into_iter().map(|claim| claim.id).collect();
        self.create(request).await
    }

    /// Reassigns the batch, keeping the previous version as history
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub async fn update_batch(
        &self,
        batch_id: SamplingBatchId,
        assigned_to: Option<ClaimAdminId>,
    ) -> Result<SamplingBatch, SamplingError> {
        let mut tx = self.store.begin().await?;
        let mut batch = tx
            .get_batch(batch_id)
            .await
            .map_err(|e| SamplingError::from_batch_lookup(batch_id, e))?;
        batch.reassign(assigned_to);
        tx.update_batch(&batch).await?;
        tx.commit().await?;

        info!(batch_id = %batch_id, "Sampling batch updated");
        self.get_batch(batch_id).await
    }

    pub async fn get_batch(&self, batch_id: SamplingBatchId) -> Result<SamplingBatch, SamplingError> {
        self.store
            .get_batch(batch_id)
            .await
            .map_err(|e| SamplingError::from_batch_lookup(batch_id, e))
    }

    /// Claims attached to a batch with their assignment
    pub async fn sampling_batch_claims(
        &self,
        batch_id: SamplingBatchId,
    ) -> Result<Vec<BatchClaim>, SamplingError> {
        self.get_batch(batch_id).await?;
        Ok(self.store.batch_claims(batch_id).await?)
    }

    pub async fn prepare_sampling_summary(
        &self,
        batch_id: SamplingBatchId,
    ) -> Result<SamplingSummary, SamplingError> {
        self.reporter.prepare_sampling_summary(batch_id).await
    }

    /// Extrapolates the delivered reviews onto the skipped claims
    ///
    /// Runs once per batch; a batch already applied is refused with
    /// [`SamplingError::BatchAlreadyApplied`] before any write. Monetary
    /// updates commit before dedrem runs. Dedrem and rejection failures are
    /// returned per claim and do not undo the updates.
    #[instrument(skip(self), fields(batch_id = %batch_id, strategy = ?self.config.extrapolation_strategy))]
    pub async fn extrapolate_results(
        &self,
        batch_id: SamplingBatchId,
        requested_by: Option<UserId>,
    ) -> Result<Vec<ClaimProcessingError>, SamplingError> {
        let mut tx = self.store.begin().await?;
        let mut batch = tx
            .get_batch(batch_id)
            .await
            .map_err(|e| SamplingError::from_batch_lookup(batch_id, e))?;
        if batch.is_applied {
            return Err(SamplingError::BatchAlreadyApplied(batch_id.to_string()));
        }
        let entries = tx.batch_claims(batch_id).await?;

        let ratio = DeductibleRatio::from_reviewed(batch_id, entries.iter().map(|e| &e.claim))?;
        debug!(
            ratio = %ratio.value(),
            approved = %ratio.approved_total(),
            adjusted = %ratio.adjusted_total(),
            reviewed = ratio.reviewed_count(),
            "Deductible ratio computed"
        );

        let targets: Vec<Claim> = entries
            .iter()
            .filter(|entry| is_extrapolation_target(entry))
            .map(|entry| entry.claim.clone())
            .collect();

        let strategy = self.config.extrapolation_strategy;
        let scale = self.config.amount_scale;
        let mut outcome = ExtrapolationOutcome::new(strategy, ratio.value());
        outcome.targets = targets.len();

        match strategy {
            ExtrapolationStrategy::Deduction => {
                for mut claim in targets {
                    claim.bypass_review();
                    claim.apply_deduction(ratio.value(), scale);
                    tx.save_valuation(&claim).await?;
                    outcome.approved.push(claim.id);
                }
            }
            ExtrapolationStrategy::Rejection => {
                let labels = self.allocator.allocate_deductible(targets.len(), ratio.value());
                for (mut claim, label) in targets.into_iter().zip(labels) {
                    claim.bypass_review();
                    match label {
                        DeductibleLabel::Approve => {
                            claim.approve_in_full(scale);
                            tx.save_valuation(&claim).await?;
                            outcome.approved.push(claim.id);
                        }
                        // Rejected through the claim status service after commit
                        DeductibleLabel::Reject => {
                            tx.set_review_status(claim.id, claim.review_status).await?;
                            outcome.rejected.push(claim.id);
                        }
                    }
                }
            }
        }

        batch.mark_applied(outcome.to_map());
        tx.update_batch(&batch).await?;
        tx.commit().await?;

        info!(
            batch_id = %batch_id,
            ratio = %outcome.ratio,
            targets = outcome.targets,
            approved = outcome.approved.len(),
            rejected = outcome.rejected.len(),
            "Extrapolation applied"
        );

        let rejected: HashSet<ClaimId> = outcome.rejected.iter().copied().collect();
        let errors = self
            .run_dedrem(&entries, &rejected, operation_metadata(batch_id, requested_by))
            .await;
        Ok(errors)
    }

    async fn run_dedrem(
        &self,
        entries: &[BatchClaim],
        rejected: &HashSet<ClaimId>,
        metadata: OperationMetadata,
    ) -> Vec<ClaimProcessingError> {
        let mut errors = Vec::new();
        for claim in entries.iter().map(|entry| &entry.claim) {
            let result = if rejected.contains(&claim.id) {
                self.valuation.reject_claim(claim.id, Some(metadata.clone())).await
            } else if claim.status == ClaimStatus::Rejected {
                continue;
            } else {
                self.valuation.process_dedrem(claim.id, Some(metadata.clone())).await
            };

            match result {
                Ok(issues) => errors.extend(
                    issues
                        .into_iter()
                        .map(|issue| ClaimProcessingError::from_issue(claim, issue)),
                ),
                Err(e) => errors.push(ClaimProcessingError::from_port(claim, &e)),
            }
        }

        for error in &errors {
            warn!(
                claim_code = %error.claim_code,
                message = %error.message,
                detail = ?error.detail,
                "Claim processing failed after extrapolation"
            );
        }
        errors
    }

    /// Handles a resolution of the review task
    ///
    /// Closes the reviews that were delivered. Once no review is pending the
    /// batch is completed and its summary cached. Returns the batch when the
    /// resolution applied to it.
    #[instrument(skip(self, resolution), fields(task_id = %resolution.task_id, batch_id = %resolution.entity_id))]
    pub async fn on_task_resolved(
        &self,
        resolution: &TaskResolution,
    ) -> Result<Option<SamplingBatch>, SamplingError> {
        if !resolution.is_accepted_resolve() {
            debug!(status = resolution.status.as_str(), "Ignoring task resolution");
            return Ok(None);
        }

        let batch_id = resolution.entity_id;
        let mut tx = self.store.begin().await?;
        let mut batch = tx
            .get_batch(batch_id)
            .await
            .map_err(|e| SamplingError::from_batch_lookup(batch_id, e))?;
        let entries = tx.batch_claims(batch_id).await?;

        let mut reviewed = Vec::new();
        let mut pending = 0;
        for entry in entries.iter().filter(|e| e.assignment.status == AssignmentStatus::Idle) {
            if entry.claim.review_status == ReviewStatus::Delivered {
                let mut assignment = entry.assignment.clone();
                assignment.mark_reviewed()?;
                reviewed.push(assignment.id);
            } else {
                pending += 1;
            }
        }

        if !reviewed.is_empty() {
            tx.update_assignment_status(&reviewed, AssignmentStatus::Reviewed)
                .await?;
        }

        if pending == 0 && !batch.is_completed {
            let summary = SamplingSummary::from_batch_claims(batch_id, &entries);
            let ratio = DeductibleRatio::from_reviewed(batch_id, entries.iter().map(|e| &e.claim)).ok();
            batch.mark_completed(summary.to_map(ratio.as_ref()));
            tx.update_batch(&batch).await?;
            info!(batch_id = %batch_id, total = summary.total, "Sampling review completed");
        }

        tx.commit().await?;
        debug!(reviewed = reviewed.len(), pending, "Task resolution applied");
        Ok(Some(batch))
    }

    /// Handles completion of the review task by extrapolating the batch
    #[instrument(skip(self, resolution), fields(task_id = %resolution.task_id, batch_id = %resolution.entity_id))]
    pub async fn on_task_completed(
        &self,
        resolution: &TaskResolution,
    ) -> Result<Vec<ClaimProcessingError>, SamplingError> {
        if !resolution.is_completion() {
            debug!(status = resolution.status.as_str(), "Ignoring task completion");
            return Ok(Vec::new());
        }
        self.extrapolate_results(resolution.entity_id, resolution.user)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(validate_percentage(1).unwrap(), 1);
        assert_eq!(validate_percentage(100).unwrap(), 100);
        assert!(matches!(validate_percentage(0), Err(SamplingError::PercentageOutOfRange(0))));
        assert!(matches!(validate_percentage(101), Err(SamplingError::PercentageOutOfRange(101))));
        assert!(validate_percentage(-5).is_err());
    }

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let a = ClaimId::new_v7();
        let b = ClaimId::new_v7();
        assert_eq!(distinct(vec![a, b, a, b, a]), vec![a, b]);
    }

    #[test]
    fn test_operation_metadata_carries_user() {
        let batch_id = SamplingBatchId::new_v7();
        let user = UserId::new_v7();
        let metadata = operation_metadata(batch_id, Some(user));
        assert_eq!(metadata.correlation_id, Some(batch_id.to_string()));
        assert_eq!(metadata.initiated_by, Some(user.to_string()));
    }
}
