//! PostgreSQL Sampling Store
//!
//! Implements [`SamplingStore`] with one database transaction per unit of
//! work. Batch, assignments, claim review fields and the review task are
//! written through the same connection, so a failure at any step rolls the
//! whole unit back.
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - `DatabaseError::NotFound` -> `PortError::NotFound`
//! - unique violations and lock conflicts -> `PortError::Conflict`
//! - Other errors -> `PortError::Internal`

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AssignmentId, ClaimAdminId, ClaimId, DomainPort, HealthCheckResult, HealthCheckable,
    PortError, SamplingBatchId, SystemPeriod, TaskId, UserId,
};
use domain_sampling::{
    Assignment, AssignmentStatus, BatchClaim, Claim, ReviewStatus, SamplingBatch, SamplingStore,
    SamplingTransaction, TaskPayload, TaskRef,
};

use crate::adapters::claims::{claim_valuation, ping, record_to_claim};
use crate::error::DatabaseError;
use crate::repositories::claims::{ClaimRecord, ClaimsRepository};
use crate::repositories::sampling::{AssignmentRow, BatchRow, NewBatch, SamplingRepository};
use crate::repositories::tasks::{NewTask, TasksRepository};

/// PostgreSQL-backed implementation of the SamplingStore trait
#[derive(Debug, Clone)]
pub struct PostgresSamplingStore {
    repository: SamplingRepository,
    pool: PgPool,
}

impl PostgresSamplingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: SamplingRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresSamplingStore {}

#[async_trait]
impl HealthCheckable for PostgresSamplingStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-sampling-store").await
    }
}

#[async_trait]
impl SamplingStore for PostgresSamplingStore {
    async fn begin(&self) -> Result<Box<dyn SamplingTransaction>, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    #[instrument(skip(self), fields(batch_id = %id))]
    async fn get_batch(&self, id: SamplingBatchId) -> Result<SamplingBatch, PortError> {
        let row = self.repository.get_batch(id.into()).await?;
        Ok(row_to_batch(row))
    }

    #[instrument(skip(self), fields(batch_id = %id))]
    async fn batch_claims(&self, id: SamplingBatchId) -> Result<Vec<BatchClaim>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        load_batch_claims(&mut conn, id).await
    }
}

/// Unit of work bound to one PostgreSQL transaction
///
/// Dropping it without `commit` rolls back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SamplingTransaction for PostgresTransaction {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn lock_claims(&mut self, ids: &[ClaimId]) -> Result<Vec<Claim>, PortError> {
        let uuids = to_uuids(ids);
        let records = ClaimsRepository::lock_current(&mut self.tx, &uuids).await?;
        debug!(locked = records.len(), "Locked candidate claims");
        records
            .into_iter()
            .map(|record| record_to_claim(record).map_err(PortError::from))
            .collect()
    }

    async fn assigned_claim_ids(&mut self, ids: &[ClaimId]) -> Result<HashSet<ClaimId>, PortError> {
        let uuids = to_uuids(ids);
        let assigned = SamplingRepository::assigned_claim_ids(&mut self.tx, &uuids).await?;
        Ok(assigned.into_iter().map(ClaimId::from_uuid).collect())
    }

    async fn insert_batch(&mut self, batch: &SamplingBatch) -> Result<i64, PortError> {
        let batch_no = SamplingRepository::insert_batch(&mut self.tx, &new_batch(batch)).await?;
        Ok(batch_no)
    }

    async fn get_batch(&mut self, id: SamplingBatchId) -> Result<SamplingBatch, PortError> {
        let row = SamplingRepository::lock_batch(&mut self.tx, id.into()).await?;
        Ok(row_to_batch(row))
    }

    async fn update_batch(&mut self, batch: &SamplingBatch) -> Result<(), PortError> {
        SamplingRepository::update_batch(&mut self.tx, &new_batch(batch)).await?;
        Ok(())
    }

    #[instrument(skip(self, assignments), fields(count = assignments.len()))]
    async fn insert_assignments(&mut self, assignments: &[Assignment]) -> Result<(), PortError> {
        let rows: Vec<AssignmentRow> = assignments.iter().map(assignment_to_row).collect();
        SamplingRepository::insert_assignments(&mut self.tx, &rows).await?;
        Ok(())
    }

    async fn update_assignment_status(
        &mut self,
        ids: &[AssignmentId],
        status: AssignmentStatus,
    ) -> Result<(), PortError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        SamplingRepository::update_assignment_status(&mut self.tx, &uuids, status.code()).await?;
        Ok(())
    }

    async fn batch_claims(&mut self, id: SamplingBatchId) -> Result<Vec<BatchClaim>, PortError> {
        load_batch_claims(&mut self.tx, id).await
    }

    async fn set_review_status(
        &mut self,
        claim_id: ClaimId,
        status: ReviewStatus,
    ) -> Result<(), PortError> {
        ClaimsRepository::set_review_status(&mut self.tx, claim_id.into(), status.code()).await?;
        Ok(())
    }

    async fn save_valuation(&mut self, claim: &Claim) -> Result<(), PortError> {
        ClaimsRepository::save_valuation(&mut self.tx, &claim_valuation(claim)).await?;
        Ok(())
    }

    #[instrument(skip(self, payload), fields(entity_id = %payload.entity_id))]
    async fn create_task(&mut self, payload: &TaskPayload) -> Result<TaskRef, PortError> {
        let task_id = TaskId::new_v7();
        let task = NewTask {
            task_id: task_id.into(),
            source: payload.source.clone(),
            entity_type: payload.entity_type.clone(),
            entity_id: payload.entity_id.into(),
            status: payload.status.as_str().to_string(),
            business_event: payload.business_event.clone(),
            executor_action_event: payload.executor_action_event.clone(),
            data: payload.data.clone(),
            task_group_id: payload.task_group.map(Uuid::from),
            requested_by: payload.requested_by.map(Uuid::from),
            created_at: Utc::now(),
        };
        TasksRepository::insert_task(&mut self.tx, &task).await?;
        Ok(TaskRef {
            id: task_id,
            status: payload.status,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}

async fn load_batch_claims(
    conn: &mut PgConnection,
    id: SamplingBatchId,
) -> Result<Vec<BatchClaim>, PortError> {
    let rows = SamplingRepository::assignments_of(&mut *conn, id.into()).await?;
    let claim_ids: Vec<Uuid> = rows.iter().map(|row| row.claim_id).collect();
    let mut claims: HashMap<Uuid, ClaimRecord> = ClaimsRepository::load(&mut *conn, &claim_ids)
        .await?
        .into_iter()
        .map(|record| (record.claim.claim_id, record))
        .collect();

    let mut batch_claims = Vec::with_capacity(rows.len());
    for row in rows {
        let record = claims
            .remove(&row.claim_id)
            .ok_or_else(|| PortError::not_found("Claim", row.claim_id))?;
        batch_claims.push(BatchClaim {
            assignment: row_to_assignment(row)?,
            claim: record_to_claim(record)?,
        });
    }
    Ok(batch_claims)
}

fn to_uuids(ids: &[ClaimId]) -> Vec<Uuid> {
    ids.iter().map(|id| Uuid::from(*id)).collect()
}

fn new_batch(batch: &SamplingBatch) -> NewBatch {
    NewBatch {
        batch_id: batch.id.into(),
        assigned_to: batch.assigned_to.map(Uuid::from),
        created_by: batch.created_by.map(Uuid::from),
        is_completed: batch.is_completed,
        is_applied: batch.is_applied,
        computed_value: batch.computed_value.clone(),
        assigned_value: batch.assigned_value.clone(),
        recorded_at: batch.system_period.recorded_at,
        updated_at: batch.updated_at,
    }
}

fn row_to_batch(row: BatchRow) -> SamplingBatch {
    SamplingBatch {
        id: SamplingBatchId::from_uuid(row.batch_id),
        batch_no: Some(row.batch_no),
        assigned_to: row.assigned_to.map(ClaimAdminId::from_uuid),
        created_by: row.created_by.map(UserId::from_uuid),
        is_completed: row.is_completed,
        is_applied: row.is_applied,
        computed_value: row.computed_value.0,
        assigned_value: row.assigned_value.0,
        system_period: SystemPeriod {
            recorded_at: row.recorded_at,
            superseded_at: row.superseded_at,
        },
        updated_at: row.updated_at,
    }
}

fn assignment_to_row(assignment: &Assignment) -> AssignmentRow {
    AssignmentRow {
        assignment_id: assignment.id.into(),
        batch_id: assignment.batch_id.into(),
        claim_id: assignment.claim_id.into(),
        status: assignment.status.code().to_string(),
        recorded_at: assignment.system_period.recorded_at,
        superseded_at: assignment.system_period.superseded_at,
    }
}

fn row_to_assignment(row: AssignmentRow) -> Result<Assignment, DatabaseError> {
    let status = AssignmentStatus::from_code(&row.status).ok_or_else(|| {
        DatabaseError::serialization(format!("unknown assignment status {}", row.status))
    })?;
    Ok(Assignment {
        id: AssignmentId::from_uuid(row.assignment_id),
        batch_id: SamplingBatchId::from_uuid(row.batch_id),
        claim_id: ClaimId::from_uuid(row.claim_id),
        status,
        system_period: SystemPeriod {
            recorded_at: row.recorded_at,
            superseded_at: row.superseded_at,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_sampling::SampleLabel;
    use serde_json::json;
    use sqlx::types::Json;

    #[test]
    fn test_assignment_row_round_trip_keeps_status_code() {
        let assignment = Assignment::new(
            SamplingBatchId::new_v7(),
            ClaimId::new_v7(),
            SampleLabel::NotSelected,
        );
        let row = assignment_to_row(&assignment);
        assert_eq!(row.status, "S");

        let restored = row_to_assignment(row).unwrap();
        assert_eq!(restored, assignment);
    }

    #[test]
    fn test_unknown_assignment_status_fails() {
        let mut row = assignment_to_row(&Assignment::new(
            SamplingBatchId::new_v7(),
            ClaimId::new_v7(),
            SampleLabel::Selected,
        ));
        row.status = "X".to_string();
        assert!(row_to_assignment(row).is_err());
    }

    #[test]
    fn test_batch_row_carries_cached_values() {
        let now = Utc::now();
        let mut computed = serde_json::Map::new();
        computed.insert("total".to_string(), json!(4));
        let row = BatchRow {
            batch_no: 12,
            batch_id: Uuid::now_v7(),
            assigned_to: None,
            created_by: Some(Uuid::now_v7()),
            is_completed: true,
            is_applied: false,
            computed_value: Json(computed),
            assigned_value: Json(serde_json::Map::new()),
            recorded_at: now,
            superseded_at: None,
            updated_at: now,
        };

        let batch = row_to_batch(row);
        assert_eq!(batch.batch_no, Some(12));
        assert!(batch.is_completed);
        assert!(batch.is_current());
        assert_eq!(batch.computed_value["total"], json!(4));

        let written = new_batch(&batch);
        assert_eq!(written.batch_id, Uuid::from(batch.id));
        assert_eq!(written.computed_value, batch.computed_value);
    }
}
