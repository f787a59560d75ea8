//! Review task persistence

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for review tasks created by sampling batches
#[derive(Debug, Clone, Copy, Default)]
pub struct TasksRepository;

impl TasksRepository {
    /// Inserts a task inside the caller's transaction
    pub async fn insert_task(conn: &mut PgConnection, task: &NewTask) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO tasks (\
                task_id, source, entity_type, entity_id, status, business_event, \
                executor_action_event, data, task_group_id, requested_by, created_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(task.task_id)
        .bind(&task.source)
        .bind(&task.entity_type)
        .bind(task.entity_id)
        .bind(&task.status)
        .bind(&task.business_event)
        .bind(&task.executor_action_event)
        .bind(Json(&task.data))
        .bind(task.task_group_id)
        .bind(task.requested_by)
        .bind(task.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// Task values to insert
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_id: Uuid,
    pub source: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub status: String,
    pub business_event: String,
    pub executor_action_event: String,
    pub data: Value,
    pub task_group_id: Option<Uuid>,
    pub requested_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
