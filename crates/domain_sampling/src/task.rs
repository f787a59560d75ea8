//! Review task bridge
//!
//! A new batch is handed to the task subsystem as one review task. The task
//! subsystem later calls back with a [`TaskResolution`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use core_kernel::{SamplingBatchId, TaskGroupId, TaskId, UserId};

use crate::batch::SamplingBatch;
use crate::claim::Claim;
use crate::error::SamplingError;
use crate::ports::SamplingTransaction;

/// Action event raised when a reviewer resolves the review task
pub const RESOLVE_ACTION_EVENT: &str = "claim_sampling_resolve";

/// Business event raised when the review task is completed
pub const COMPLETE_BUSINESS_EVENT: &str = "claim_sampling_complete";

/// Entity type recorded on sampling tasks
pub const BATCH_ENTITY_TYPE: &str = "ClaimSamplingBatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Received,
    Accepted,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Received => "RECEIVED",
            TaskStatus::Accepted => "ACCEPTED",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "RECEIVED" => Some(TaskStatus::Received),
            "ACCEPTED" => Some(TaskStatus::Accepted),
            "COMPLETED" => Some(TaskStatus::Completed),
            "FAILED" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// Payload accepted by the task subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub source: String,
    pub entity_type: String,
    pub entity_id: SamplingBatchId,
    pub status: TaskStatus,
    pub business_event: String,
    pub executor_action_event: String,
    /// Opaque to the task subsystem
    pub data: Value,
    pub task_group: Option<TaskGroupId>,
    pub requested_by: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: TaskId,
    pub status: TaskStatus,
}

/// Callback from the task subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResolution {
    pub task_id: TaskId,
    pub entity_id: SamplingBatchId,
    pub status: TaskStatus,
    #[serde(default)]
    pub business_event: Option<String>,
    #[serde(default)]
    pub executor_action_event: Option<String>,
    #[serde(default)]
    pub user: Option<UserId>,
}

impl TaskResolution {
    pub fn is_accepted_resolve(&self) -> bool {
        self.status == TaskStatus::Accepted
            && self.executor_action_event.as_deref() == Some(RESOLVE_ACTION_EVENT)
    }

    pub fn is_completion(&self) -> bool {
        matches!(self.status, TaskStatus::Accepted | TaskStatus::Completed)
            && self.business_event.as_deref() == Some(COMPLETE_BUSINESS_EVENT)
    }
}

/// Builds and submits review tasks
#[derive(Debug, Clone)]
pub struct TaskBridge {
    source: String,
}

impl TaskBridge {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// Packages the batch and its `(claim_code, batch_id)` pairs
    pub fn build_payload(
        &self,
        batch: &SamplingBatch,
        claims: &[Claim],
        requested_by: Option<UserId>,
        task_group: Option<TaskGroupId>,
    ) -> TaskPayload {
        let batch_ref = batch.id.as_uuid().to_string();
        let pairs: Vec<Value> = claims
            .iter()
            .map(|claim| json!([claim.code, batch_ref]))
            .collect();

        TaskPayload {
            source: self.source.clone(),
            entity_type: BATCH_ENTITY_TYPE.to_string(),
            entity_id: batch.id,
            status: if task_group.is_some() { TaskStatus::Accepted } else { TaskStatus::Received },
            business_event: COMPLETE_BUSINESS_EVENT.to_string(),
            executor_action_event: RESOLVE_ACTION_EVENT.to_string(),
            data: json!({ "batch_id": batch_ref, "claims": pairs }),
            task_group,
            requested_by,
        }
    }

    /// Creates the review task inside the caller's transaction
    ///
    /// A failure rolls back the whole batch creation.
    #[instrument(skip(self, tx, batch, claims), fields(batch_id = %batch.id, claims = claims.len()))]
    pub async fn create_review_task(
        &self,
        tx: &mut dyn SamplingTransaction,
        batch: &SamplingBatch,
        claims: &[Claim],
        requested_by: Option<UserId>,
        task_group: Option<TaskGroupId>,
    ) -> Result<TaskRef, SamplingError> {
        let payload = self.build_payload(batch, claims, requested_by, task_group);
        let task = tx.create_task(&payload).await?;
        debug!(task_id = %task.id, status = task.status.as_str(), "Review task created");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_depends_on_task_group() {
        let bridge = TaskBridge::new("claim_sampling");
        let batch = SamplingBatch::new(None, None);

        let payload = bridge.build_payload(&batch, &[], None, None);
        assert_eq!(payload.status, TaskStatus::Received);

        let payload = bridge.build_payload(&batch, &[], None, Some(TaskGroupId::new_v7()));
        assert_eq!(payload.status, TaskStatus::Accepted);
        assert_eq!(payload.source, "claim_sampling");
        assert_eq!(payload.entity_id, batch.id);
        assert_eq!(payload.data["claims"], json!([]));
    }

    #[test]
    fn test_resolution_matching() {
        let resolution = TaskResolution {
            task_id: TaskId::new_v7(),
            entity_id: SamplingBatchId::new_v7(),
            status: TaskStatus::Accepted,
            business_event: None,
            executor_action_event: Some(RESOLVE_ACTION_EVENT.to_string()),
            user: None,
        };
        assert!(resolution.is_accepted_resolve());
        assert!(!resolution.is_completion());

        let failed = TaskResolution { status: TaskStatus::Failed, ..resolution };
        assert!(!failed.is_accepted_resolve());
    }
}
