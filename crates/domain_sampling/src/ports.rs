//! Sampling Domain Ports
//!
//! This module defines what the sampling domain needs from the outside world.
//! Claims, tasks and persistence are owned elsewhere; the domain reaches them
//! only through these traits.
//!
//! # Architecture
//!
//! - [`SamplingStore`]: batch and assignment persistence. Every write goes
//!   through a [`SamplingTransaction`] so that a batch, its assignments, the
//!   claim review-state changes and the review task commit together.
//! - [`ClaimQueryPort`]: claim search used to build the candidate set.
//! - [`ClaimValuationPort`]: the claim status service running dedrem
//!   (deduction / remuneration) and rejections.
//!
//! Adapters:
//!
//! - **PostgreSQL Adapter**: `infra_db::adapters::PostgresSamplingStore`
//! - **Mock Adapter**: [`mock::InMemorySamplingStore`], for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! let claims = tx.lock_claims(&ids).await?;
//! // ... writes ...
//! tx.commit().await?;
//! ```
//!
//! Dropping a transaction without committing discards its writes.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{
    AssignmentId, ClaimId, DomainPort, HealthCheckable, OperationMetadata, PortError,
    SamplingBatchId,
};

use crate::batch::{Assignment, AssignmentStatus, BatchClaim, SamplingBatch};
use crate::claim::{Claim, ReviewStatus};
use crate::filter::ClaimFilter;
use crate::task::{TaskPayload, TaskRef};

/// Persistence of sampling batches
#[async_trait]
pub trait SamplingStore: DomainPort + HealthCheckable {
    /// Opens a unit of work
    async fn begin(&self) -> Result<Box<dyn SamplingTransaction>, PortError>;

    /// Retrieves the current version of a batch, or `PortError::NotFound`
    async fn get_batch(&self, id: SamplingBatchId) -> Result<SamplingBatch, PortError>;

    /// Claims of a batch with their current assignment, in assignment order
    async fn batch_claims(&self, id: SamplingBatchId) -> Result<Vec<BatchClaim>, PortError>;
}

/// Unit of work over the sampling tables and the claim review fields
#[async_trait]
pub trait SamplingTransaction: Send {
    /// Loads and locks the current claims among `ids`
    ///
    /// Claims keep the order of `ids`. Unknown or superseded ids are skipped.
    async fn lock_claims(&mut self, ids: &[ClaimId]) -> Result<Vec<Claim>, PortError>;

    /// Ids among `ids` already bound to a current assignment of any batch
    async fn assigned_claim_ids(&mut self, ids: &[ClaimId]) -> Result<HashSet<ClaimId>, PortError>;

    /// Persists a new batch and returns its surrogate number
    async fn insert_batch(&mut self, batch: &SamplingBatch) -> Result<i64, PortError>;

    /// Loads and locks the current version of a batch
    async fn get_batch(&mut self, id: SamplingBatchId) -> Result<SamplingBatch, PortError>;

    /// Writes a new version of a batch, keeping the previous one as history
    async fn update_batch(&mut self, batch: &SamplingBatch) -> Result<(), PortError>;

    /// Bulk insert
    ///
    /// Fails with `PortError::Conflict` when a claim already has a current
    /// assignment.
    async fn insert_assignments(&mut self, assignments: &[Assignment]) -> Result<(), PortError>;

    async fn update_assignment_status(
        &mut self,
        ids: &[AssignmentId],
        status: AssignmentStatus,
    ) -> Result<(), PortError>;

    async fn batch_claims(&mut self, id: SamplingBatchId) -> Result<Vec<BatchClaim>, PortError>;

    async fn set_review_status(
        &mut self,
        claim_id: ClaimId,
        status: ReviewStatus,
    ) -> Result<(), PortError>;

    /// Writes claim status, review status, approved amount and line approvals
    async fn save_valuation(&mut self, claim: &Claim) -> Result<(), PortError>;

    /// Submits a task to the task subsystem as part of this unit of work
    async fn create_task(&mut self, payload: &TaskPayload) -> Result<TaskRef, PortError>;

    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}

/// Claim search
#[async_trait]
pub trait ClaimQueryPort: DomainPort {
    /// Current claims matching the filter
    ///
    /// # Arguments
    ///
    /// * `filter` - Business criteria
    /// * `metadata` - Optional operation metadata for tracing/auditing
    async fn find_claims(
        &self,
        filter: &ClaimFilter,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Claim>, PortError>;
}

/// Non-fatal finding reported by the claim status service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIssue {
    pub claim_id: ClaimId,
    pub code: String,
    pub message: String,
}

/// Claim status service
#[async_trait]
pub trait ClaimValuationPort: DomainPort {
    /// Runs dedrem validation and processing for one claim
    ///
    /// # Returns
    ///
    /// Issues found while processing; an empty list means success
    async fn process_dedrem(
        &self,
        claim_id: ClaimId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<ClaimIssue>, PortError>;

    /// Rejects a claim through the claim status workflow
    async fn reject_claim(
        &self,
        claim_id: ClaimId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<ClaimIssue>, PortError>;
}

/// In-memory implementation of every sampling port
///
/// Transactions are serialised by one async mutex. A transaction works on a
/// snapshot of the state and writes it back on commit.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::Utc;
    use core_kernel::{AdapterHealth, HealthCheckResult, SystemPeriod, TaskId};
    use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

    use crate::claim::ClaimStatus;

    #[derive(Debug, Clone, Default)]
    struct StoreState {
        claims: HashMap<ClaimId, Claim>,
        claim_order: Vec<ClaimId>,
        batches: HashMap<SamplingBatchId, SamplingBatch>,
        batch_history: Vec<SamplingBatch>,
        assignments: Vec<Assignment>,
        tasks: Vec<(TaskRef, TaskPayload)>,
        next_batch_no: i64,
    }

    impl StoreState {
        fn batch(&self, id: SamplingBatchId) -> Result<SamplingBatch, PortError> {
            self.batches
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("SamplingBatch", id))
        }

        fn batch_claims(&self, id: SamplingBatchId) -> Vec<BatchClaim> {
            self.assignments
                .iter()
                .filter(|a| a.batch_id == id && a.system_period.is_current())
                .filter_map(|a| {
                    self.claims.get(&a.claim_id).map(|claim| BatchClaim {
                        assignment: a.clone(),
                        claim: claim.clone(),
                    })
                })
                .collect()
        }

        fn claim_mut(&mut self, id: ClaimId) -> Result<&mut Claim, PortError> {
            self.claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))
        }
    }

    #[derive(Debug, Default)]
    struct Failures {
        task_creation: bool,
        dedrem: HashSet<ClaimId>,
    }

    /// In-memory sampling store, claim search and claim status service
    #[derive(Debug, Clone, Default)]
    pub struct InMemorySamplingStore {
        state: Arc<Mutex<StoreState>>,
        failures: Arc<RwLock<Failures>>,
    }

    impl InMemorySamplingStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with claims for testing
        pub async fn with_claims(claims: Vec<Claim>) -> Self {
            let store = Self::new();
            for claim in claims {
                store.insert_claim(claim).await;
            }
            store
        }

        pub async fn insert_claim(&self, claim: Claim) {
            let mut state = self.state.lock().await;
            if !state.claims.contains_key(&claim.id) {
                state.claim_order.push(claim.id);
            }
            state.claims.insert(claim.id, claim);
        }

        pub async fn claim(&self, id: ClaimId) -> Option<Claim> {
            self.state.lock().await.claims.get(&id).cloned()
        }

        /// Applies a change to a stored claim, as a reviewer would
        pub async fn update_claim<F>(&self, id: ClaimId, change: F) -> Result<(), PortError>
        where
            F: FnOnce(&mut Claim) + Send,
        {
            let mut state = self.state.lock().await;
            change(state.claim_mut(id)?);
            Ok(())
        }

        pub async fn assignments(&self, batch_id: SamplingBatchId) -> Vec<Assignment> {
            self.state
                .lock()
                .await
                .assignments
                .iter()
                .filter(|a| a.batch_id == batch_id)
                .cloned()
                .collect()
        }

        pub async fn tasks(&self) -> Vec<(TaskRef, TaskPayload)> {
            self.state.lock().await.tasks.clone()
        }

        pub async fn batch_count(&self) -> usize {
            self.state.lock().await.batches.len()
        }

        /// Superseded versions of a batch
        pub async fn batch_history(&self, batch_id: SamplingBatchId) -> Vec<SamplingBatch> {
            self.state
                .lock()
                .await
                .batch_history
                .iter()
                .filter(|b| b.id == batch_id)
                .cloned()
                .collect()
        }

        pub async fn fail_task_creation(&self, fail: bool) {
            self.failures.write().await.task_creation = fail;
        }

        /// Makes dedrem and rejection report an issue for the claim
        pub async fn fail_dedrem_for(&self, claim_id: ClaimId) {
            self.failures.write().await.dedrem.insert(claim_id);
        }
    }

    impl DomainPort for InMemorySamplingStore {}

    #[async_trait]
    impl HealthCheckable for InMemorySamplingStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-sampling-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl SamplingStore for InMemorySamplingStore {
        async fn begin(&self) -> Result<Box<dyn SamplingTransaction>, PortError> {
            let guard = self.state.clone().lock_owned().await;
            let work = guard.clone();
            let fail_task_creation = self.failures.read().await.task_creation;
            Ok(Box::new(InMemoryTransaction { guard, work, fail_task_creation }))
        }

        async fn get_batch(&self, id: SamplingBatchId) -> Result<SamplingBatch, PortError> {
            self.state.lock().await.batch(id)
        }

        async fn batch_claims(&self, id: SamplingBatchId) -> Result<Vec<BatchClaim>, PortError> {
            Ok(self.state.lock().await.batch_claims(id))
        }
    }

    /// Snapshot transaction holding the store lock until commit or drop
    pub struct InMemoryTransaction {
        guard: OwnedMutexGuard<StoreState>,
        work: StoreState,
        fail_task_creation: bool,
    }

    #[async_trait]
    impl SamplingTransaction for InMemoryTransaction {
        async fn lock_claims(&mut self, ids: &[ClaimId]) -> Result<Vec<Claim>, PortError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.work.claims.get(id))
                .filter(|claim| claim.is_current())
                .cloned()
                .collect())
        }

        async fn assigned_claim_ids(&mut self, ids: &[ClaimId]) -> Result<HashSet<ClaimId>, PortError> {
            Ok(self
                .work
                .assignments
                .iter()
                .filter(|a| a.system_period.is_current() && ids.contains(&a.claim_id))
                .map(|a| a.claim_id)
                .collect())
        }

        async fn insert_batch(&mut self, batch: &SamplingBatch) -> Result<i64, PortError> {
            if self.work.batches.contains_key(&batch.id) {
                return Err(PortError::conflict(format!("Sampling batch {} already exists", batch.id)));
            }
            self.work.next_batch_no += 1;
            let batch_no = self.work.next_batch_no;
            let mut stored = batch.clone();
            stored.batch_no = Some(batch_no);
            self.work.batches.insert(stored.id, stored);
            Ok(batch_no)
        }

        async fn get_batch(&mut self, id: SamplingBatchId) -> Result<SamplingBatch, PortError> {
            self.work.batch(id)
        }

        async fn update_batch(&mut self, batch: &SamplingBatch) -> Result<(), PortError> {
            let mut previous = self.work.batch(batch.id)?;
            let batch_no = previous.batch_no;
            previous
                .system_period
                .supersede()
                .map_err(|e| PortError::internal(e.to_string()))?;
            self.work.batch_history.push(previous);

            let mut current = batch.clone();
            current.batch_no = current.batch_no.or(batch_no);
            current.system_period = SystemPeriod::current();
            self.work.batches.insert(current.id, current);
            Ok(())
        }

        async fn insert_assignments(&mut self, assignments: &[Assignment]) -> Result<(), PortError> {
            for assignment in assignments {
                let taken = self
                    .work
                    .assignments
                    .iter()
                    .any(|a| a.claim_id == assignment.claim_id && a.system_period.is_current());
                if taken {
                    return Err(PortError::conflict(format!(
                        "Claim {} already has a sampling assignment",
                        assignment.claim_id
                    )));
                }
                self.work.assignments.push(assignment.clone());
            }
            Ok(())
        }

        async fn update_assignment_status(
            &mut self,
            ids: &[AssignmentId],
            status: AssignmentStatus,
        ) -> Result<(), PortError> {
            for assignment in self.work.assignments.iter_mut().filter(|a| ids.contains(&a.id)) {
                assignment.status = status;
            }
            Ok(())
        }

        async fn batch_claims(&mut self, id: SamplingBatchId) -> Result<Vec<BatchClaim>, PortError> {
            Ok(self.work.batch_claims(id))
        }

        async fn set_review_status(
            &mut self,
            claim_id: ClaimId,
            status: ReviewStatus,
        ) -> Result<(), PortError> {
            self.work.claim_mut(claim_id)?.review_status = status;
            Ok(())
        }

        async fn save_valuation(&mut self, claim: &Claim) -> Result<(), PortError> {
            let stored = self.work.claim_mut(claim.id)?;
            stored.status = claim.status;
            stored.review_status = claim.review_status;
            stored.approved = claim.approved;
            stored.items = claim.items.clone();
            stored.services = claim.services.clone();
            Ok(())
        }

        async fn create_task(&mut self, payload: &TaskPayload) -> Result<TaskRef, PortError> {
            if self.fail_task_creation {
                return Err(PortError::internal("Task service rejected the review task"));
            }
            let task = TaskRef { id: TaskId::new_v7(), status: payload.status };
            self.work.tasks.push((task, payload.clone()));
            Ok(task)
        }

        async fn commit(self: Box<Self>) -> Result<(), PortError> {
            let InMemoryTransaction { mut guard, work, .. } = *self;
            *guard = work;
            Ok(())
        }
    }

    #[async_trait]
    impl ClaimQueryPort for InMemorySamplingStore {
        async fn find_claims(
            &self,
            filter: &ClaimFilter,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Claim>, PortError> {
            let state = self.state.lock().await;
            Ok(state
                .claim_order
                .iter()
                .filter_map(|id| state.claims.get(id))
                .filter(|claim| filter.matches(claim))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl ClaimValuationPort for InMemorySamplingStore {
        async fn process_dedrem(
            &self,
            claim_id: ClaimId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<ClaimIssue>, PortError> {
            if self.failures.read().await.dedrem.contains(&claim_id) {
                return Ok(vec![ClaimIssue {
                    claim_id,
                    code: "dedrem_failed".to_string(),
                    message: "Dedrem validation failed".to_string(),
                }]);
            }
            let mut state = self.state.lock().await;
            let claim = state.claim_mut(claim_id)?;
            if claim.status != ClaimStatus::Rejected {
                claim.status = ClaimStatus::Processed;
            }
            Ok(Vec::new())
        }

        async fn reject_claim(
            &self,
            claim_id: ClaimId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<ClaimIssue>, PortError> {
            if self.failures.read().await.dedrem.contains(&claim_id) {
                return Ok(vec![ClaimIssue {
                    claim_id,
                    code: "rejection_failed".to_string(),
                    message: "Claim rejection failed".to_string(),
                }]);
            }
            let mut state = self.state.lock().await;
            state.claim_mut(claim_id)?.reject_in_full();
            Ok(Vec::new())
        }
    }
}
