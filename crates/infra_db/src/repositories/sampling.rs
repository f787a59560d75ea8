//! Sampling batch repository implementation
//!
//! Batches are versioned: the current version lives in
//! `claim_sampling_batches`, superseded versions are copied to
//! `claim_sampling_batch_history` before an update.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::DatabaseError;

const BATCH_COLUMNS: &str = "batch_no, batch_id, assigned_to, created_by, is_completed, is_applied, \
    computed_value, assigned_value, recorded_at, superseded_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "assignment_id, batch_id, claim_id, status, recorded_at, superseded_at";

/// Bind parameters per inserted assignment row
const ASSIGNMENT_BINDS: usize = 5;

/// Rows per insert statement; a Bind message carries at most `u16::MAX` parameters
const ASSIGNMENT_CHUNK: usize = u16::MAX as usize / ASSIGNMENT_BINDS;

/// Repository for sampling batches and their claim assignments
#[derive(Debug, Clone)]
pub struct SamplingRepository {
    pool: PgPool,
}

impl SamplingRepository {
    /// Creates a new SamplingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves the current version of a batch
    pub async fn get_batch(&self, batch_id: Uuid) -> Result<BatchRow, DatabaseError> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM claim_sampling_batches \
             WHERE batch_id = $1 AND superseded_at IS NULL"
        );
        sqlx::query_as(&sql)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("SamplingBatch", batch_id))
    }

    /// Locks the current version of a batch
    pub async fn lock_batch(conn: &mut PgConnection, batch_id: Uuid) -> Result<BatchRow, DatabaseError> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM claim_sampling_batches \
             WHERE batch_id = $1 AND superseded_at IS NULL \
             FOR UPDATE"
        );
        sqlx::query_as(&sql)
            .bind(batch_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::not_found("SamplingBatch", batch_id))
    }

    /// Inserts a batch and returns the generated batch number
    pub async fn insert_batch(conn: &mut PgConnection, batch: &NewBatch) -> Result<i64, DatabaseError> {
        let batch_no = sqlx::query_scalar(
            "INSERT INTO claim_sampling_batches (\
                batch_id, assigned_to, created_by, is_completed, is_applied, \
                computed_value, assigned_value, recorded_at, updated_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING batch_no",
        )
        .bind(batch.batch_id)
        .bind(batch.assigned_to)
        .bind(batch.created_by)
        .bind(batch.is_completed)
        .bind(batch.is_applied)
        .bind(Json(&batch.computed_value))
        .bind(Json(&batch.assigned_value))
        .bind(batch.recorded_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(batch_no)
    }

    /// Copies the current version to history and rewrites it
    pub async fn update_batch(conn: &mut PgConnection, batch: &NewBatch) -> Result<(), DatabaseError> {
        let archived = sqlx::query(
            "INSERT INTO claim_sampling_batch_history (\
                batch_no, batch_id, assigned_to, created_by, is_completed, is_applied, \
                computed_value, assigned_value, recorded_at, superseded_at, updated_at\
             ) \
             SELECT batch_no, batch_id, assigned_to, created_by, is_completed, is_applied, \
                computed_value, assigned_value, recorded_at, GREATEST(now(), recorded_at), updated_at \
             FROM claim_sampling_batches \
             WHERE batch_id = $1 AND superseded_at IS NULL",
        )
        .bind(batch.batch_id)
        .execute(&mut *conn)
        .await?;

        if archived.rows_affected() == 0 {
            return Err(DatabaseError::not_found("SamplingBatch", batch.batch_id));
        }

        sqlx::query(
            "UPDATE claim_sampling_batches SET \
                assigned_to = $2, is_completed = $3, is_applied = $4, \
                computed_value = $5, assigned_value = $6, \
                recorded_at = GREATEST(now(), recorded_at), updated_at = $7 \
             WHERE batch_id = $1 AND superseded_at IS NULL",
        )
        .bind(batch.batch_id)
        .bind(batch.assigned_to)
        .bind(batch.is_completed)
        .bind(batch.is_applied)
        .bind(Json(&batch.computed_value))
        .bind(Json(&batch.assigned_value))
        .bind(batch.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Claim ids among `claim_ids` with a current assignment in any batch
    pub async fn assigned_claim_ids(
        conn: &mut PgConnection,
        claim_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let ids = sqlx::query_scalar(
            "SELECT claim_id FROM claim_sampling_batch_assignments \
             WHERE claim_id = ANY($1) AND superseded_at IS NULL",
        )
        .bind(claim_ids)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids)
    }

    /// Bulk inserts assignments, one statement per chunk of rows
    ///
    /// Runs on the caller's connection, so a failed chunk rolls back with
    /// the surrounding transaction.
    pub async fn insert_assignments(
        conn: &mut PgConnection,
        assignments: &[AssignmentRow],
    ) -> Result<(), DatabaseError> {
        for mut query in assignment_inserts(assignments) {
            query.build().execute(&mut *conn).await?;
        }
        Ok(())
    }

    pub async fn update_assignment_status(
        conn: &mut PgConnection,
        assignment_ids: &[Uuid],
        status: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE claim_sampling_batch_assignments SET status = $2 \
             WHERE assignment_id = ANY($1) AND superseded_at IS NULL",
        )
        .bind(assignment_ids)
        .bind(status)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn assignments_of(
        conn: &mut PgConnection,
        batch_id: Uuid,
    ) -> Result<Vec<AssignmentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM claim_sampling_batch_assignments \
             WHERE batch_id = $1 AND superseded_at IS NULL \
             ORDER BY recorded_at, assignment_id"
        );
        let rows = sqlx::query_as(&sql).bind(batch_id).fetch_all(&mut *conn).await?;
        Ok(rows)
    }
}

fn assignment_inserts(assignments: &[AssignmentRow]) -> Vec<QueryBuilder<'_, Postgres>> {
    assignments.chunks(ASSIGNMENT_CHUNK).map(assignment_insert).collect()
}

fn assignment_insert(assignments: &[AssignmentRow]) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new(
        "INSERT INTO claim_sampling_batch_assignments \
         (assignment_id, batch_id, claim_id, status, recorded_at) ",
    );
    query.push_values(assignments, |mut row, assignment| {
        row.push_bind(assignment.assignment_id)
            .push_bind(assignment.batch_id)
            .push_bind(assignment.claim_id)
            .push_bind(assignment.status.as_str())
            .push_bind(assignment.recorded_at);
    });
    query
}

/// Database row for a sampling batch
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchRow {
    pub batch_no: i64,
    pub batch_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub is_completed: bool,
    pub is_applied: bool,
    pub computed_value: Json<Map<String, Value>>,
    pub assigned_value: Json<Map<String, Value>>,
    pub recorded_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Batch values to insert or write as a new version
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub is_completed: bool,
    pub is_applied: bool,
    pub computed_value: Map<String, Value>,
    pub assigned_value: Map<String, Value>,
    pub recorded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a claim assignment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentRow {
    pub assignment_id: Uuid,
    pub batch_id: Uuid,
    pub claim_id: Uuid,
    pub status: String,
    pub recorded_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sqlx::Execute;

    fn rows(count: usize) -> Vec<AssignmentRow> {
        let now = Utc::now();
        (0..count)
            .map(|_| AssignmentRow {
                assignment_id: Uuid::now_v7(),
                batch_id: Uuid::nil(),
                claim_id: Uuid::now_v7(),
                status: "S".to_string(),
                recorded_at: now,
                superseded_at: None,
            })
            .collect()
    }

    #[test]
    fn test_assignment_insert_binds_five_values_per_row() {
        let rows = rows(3);
        let mut query = assignment_insert(&rows);
        let sql = query.build().sql().to_string();
        assert!(sql.starts_with("INSERT INTO claim_sampling_batch_assignments"));
        assert!(sql.contains("($11, $12, $13, $14, $15)"));
        assert!(!sql.contains("$16"));
    }

    #[test]
    fn test_large_pools_are_split_below_the_bind_limit() {
        let rows = rows(ASSIGNMENT_CHUNK * 2 + 3);

        let mut statements = assignment_inserts(&rows);

        assert_eq!(statements.len(), 3);
        let full = statements[0].build().sql().to_string();
        assert!(full.contains(&format!("${}", ASSIGNMENT_CHUNK * ASSIGNMENT_BINDS)));
        assert!(ASSIGNMENT_CHUNK * ASSIGNMENT_BINDS <= u16::MAX as usize);
        let tail = statements[2].build().sql().to_string();
        assert!(tail.contains("$15)"));
        assert!(!tail.contains("$16"));
    }

    #[test]
    fn test_empty_assignments_issue_no_statement() {
        assert!(assignment_inserts(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn assignment_insert_is_a_single_statement(count in 1usize..40) {
            let rows = rows(count);
            let mut query = assignment_insert(&rows);
            let sql = query.build().sql().to_string();
            let last = format!("${}", count * 5);
            let over = format!("${}", count * 5 + 1);
            prop_assert!(sql.contains(&last));
            prop_assert!(!sql.contains(&over));
            prop_assert_eq!(sql.matches("INSERT").count(), 1);
        }
    }
}
