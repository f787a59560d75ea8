//! Claims repository implementation
//!
//! Read access to claims and their detail lines, plus the handful of writes
//! sampling performs on them: review status and approved valuation.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use domain_sampling::filter::{AttachmentStatus, ClaimFilter};

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = "claim_id, claim_code, status, review_status, health_facility_id, \
    insuree_id, admin_id, care_type, visit_type, date_from, date_to, date_claimed, claimed, \
    approved, attachments_count, restored_from, recorded_at, superseded_at";

const DETAIL_COLUMNS: &str = "detail_id, claim_id, kind, code, status, qty_provided, qty_approved, \
    price_asked, price_adjusted, price_approved, rejection_reason";

/// Repository for claim data used by sampling
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    /// Creates a new ClaimsRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current claims matching the filter, with their detail lines
    pub async fn search(&self, filter: &ClaimFilter) -> Result<Vec<ClaimRecord>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let mut query = filter_query(filter);
        let rows: Vec<ClaimRow> = query.build_query_as().fetch_all(&mut *conn).await?;
        Self::attach_details(&mut *conn, rows).await
    }

    /// Loads current claims and locks their rows until the transaction ends
    ///
    /// Records come back in the order of `ids`; unknown ids are skipped.
    pub async fn lock_current(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<ClaimRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {CLAIM_COLUMNS} FROM claims \
             WHERE claim_id = ANY($1) AND superseded_at IS NULL \
             ORDER BY claim_id \
             FOR UPDATE"
        );
        let rows: Vec<ClaimRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&mut *conn).await?;

        let mut by_id: HashMap<Uuid, ClaimRow> = rows.into_iter().map(|r| (r.claim_id, r)).collect();
        let ordered = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        Self::attach_details(conn, ordered).await
    }

    /// Loads claims by id without locking, in the order of `ids`
    pub async fn load(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<ClaimRecord>, DatabaseError> {
        let sql = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_id = ANY($1)");
        let rows: Vec<ClaimRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&mut *conn).await?;

        let mut by_id: HashMap<Uuid, ClaimRow> = rows.into_iter().map(|r| (r.claim_id, r)).collect();
        let ordered = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        Self::attach_details(conn, ordered).await
    }

    async fn attach_details(
        conn: &mut PgConnection,
        rows: Vec<ClaimRow>,
    ) -> Result<Vec<ClaimRecord>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.claim_id).collect();
        let sql = format!(
            "SELECT {DETAIL_COLUMNS} FROM claim_details \
             WHERE claim_id = ANY($1) AND superseded_at IS NULL \
             ORDER BY detail_id"
        );
        let details: Vec<ClaimDetailRow> = sqlx::query_as(&sql).bind(&ids).fetch_all(&mut *conn).await?;

        let mut by_claim: HashMap<Uuid, Vec<ClaimDetailRow>> = HashMap::new();
        for detail in details {
            by_claim.entry(detail.claim_id).or_default().push(detail);
        }

        Ok(rows
            .into_iter()
            .map(|claim| ClaimRecord {
                details: by_claim.remove(&claim.claim_id).unwrap_or_default(),
                claim,
            })
            .collect())
    }

    pub async fn set_review_status(
        conn: &mut PgConnection,
        claim_id: Uuid,
        review_status: i16,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE claims SET review_status = $2 WHERE claim_id = $1 AND superseded_at IS NULL",
        )
        .bind(claim_id)
        .bind(review_status)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", claim_id));
        }
        Ok(())
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        claim_id: Uuid,
        status: i16,
        approved: Option<Decimal>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE claims SET status = $2, approved = COALESCE($3, approved) \
             WHERE claim_id = $1 AND superseded_at IS NULL",
        )
        .bind(claim_id)
        .bind(status)
        .bind(approved)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", claim_id));
        }
        Ok(())
    }

    /// Writes the valuation of a claim and the approved prices of its lines
    pub async fn save_valuation(
        conn: &mut PgConnection,
        valuation: &ClaimValuation,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE claims SET status = $2, review_status = $3, approved = $4 \
             WHERE claim_id = $1 AND superseded_at IS NULL",
        )
        .bind(valuation.claim_id)
        .bind(valuation.status)
        .bind(valuation.review_status)
        .bind(valuation.approved)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", valuation.claim_id));
        }

        if valuation.detail_prices.is_empty() {
            return Ok(());
        }
        let (detail_ids, prices): (Vec<i64>, Vec<Option<Decimal>>) =
            valuation.detail_prices.iter().copied().unzip();
        sqlx::query(
            "UPDATE claim_details AS d SET price_approved = v.price_approved \
             FROM UNNEST($1::BIGINT[], $2::NUMERIC[]) AS v(detail_id, price_approved) \
             WHERE d.detail_id = v.detail_id AND d.claim_id = $3",
        )
        .bind(&detail_ids)
        .bind(&prices)
        .bind(valuation.claim_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Builds the candidate search over current claims
fn filter_query(filter: &ClaimFilter) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {CLAIM_COLUMNS} FROM claims c WHERE c.superseded_at IS NULL"
    ));

    if let Some(status) = filter.status {
        query.push(" AND c.status = ").push_bind(status.code());
    }
    if let Some(review_status) = filter.review_status {
        query.push(" AND c.review_status = ").push_bind(review_status.code());
    }
    if let Some(health_facility_id) = filter.health_facility_id {
        query.push(" AND c.health_facility_id = ").push_bind(health_facility_id);
    }
    if let Some(admin_id) = filter.admin_id {
        query.push(" AND c.admin_id = ").push_bind(*admin_id.as_uuid());
    }
    if let Some(insuree_id) = filter.insuree_id {
        query.push(" AND c.insuree_id = ").push_bind(insuree_id);
    }
    if let Some(care_type) = &filter.care_type {
        query.push(" AND c.care_type = ").push_bind(care_type);
    }
    if let Some(visit_type) = &filter.visit_type {
        query.push(" AND c.visit_type = ").push_bind(visit_type);
    }
    if let Some(date_from) = filter.date_from {
        query.push(" AND c.date_from >= ").push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        query.push(" AND COALESCE(c.date_to, c.date_from) <= ").push_bind(date_to);
    }
    if let Some(date) = filter.date_claimed_from {
        query.push(" AND c.date_claimed >= ").push_bind(date);
    }
    if let Some(date) = filter.date_claimed_to {
        query.push(" AND c.date_claimed <= ").push_bind(date);
    }
    for (kind, codes) in [("item", &filter.item_codes), ("service", &filter.service_codes)] {
        if !codes.is_empty() {
            query
                .push(" AND EXISTS (SELECT 1 FROM claim_details d WHERE d.claim_id = c.claim_id AND d.superseded_at IS NULL AND d.kind = ")
                .push_bind(kind)
                .push(" AND d.code = ANY(")
                .push_bind(codes)
                .push("))");
        }
    }
    match filter.attachment_status {
        AttachmentStatus::With => {
            query.push(" AND c.attachments_count > 0");
        }
        AttachmentStatus::Without => {
            query.push(" AND c.attachments_count = 0");
        }
        AttachmentStatus::Any => {}
    }
    if let Some(code) = &filter.code_is_not {
        query.push(" AND c.claim_code <> ").push_bind(code);
    }
    if filter.show_restored {
        query.push(" AND c.restored_from IS NOT NULL");
    }

    query.push(" ORDER BY c.date_claimed, c.claim_code");
    query
}

/// Database row for a claim
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub claim_code: String,
    pub status: i16,
    pub review_status: i16,
    pub health_facility_id: Option<i32>,
    pub insuree_id: Option<i32>,
    pub admin_id: Option<Uuid>,
    pub care_type: Option<String>,
    pub visit_type: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: Option<NaiveDate>,
    pub date_claimed: NaiveDate,
    pub claimed: Decimal,
    pub approved: Option<Decimal>,
    pub attachments_count: i32,
    pub restored_from: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
}

/// Database row for an item or service line
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimDetailRow {
    pub detail_id: i64,
    pub claim_id: Uuid,
    pub kind: String,
    pub code: String,
    pub status: i16,
    pub qty_provided: Decimal,
    pub qty_approved: Option<Decimal>,
    pub price_asked: Decimal,
    pub price_adjusted: Option<Decimal>,
    pub price_approved: Option<Decimal>,
    pub rejection_reason: Option<i16>,
}

/// A claim row with its current detail lines
#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub claim: ClaimRow,
    pub details: Vec<ClaimDetailRow>,
}

/// Valuation written back for one claim
#[derive(Debug, Clone)]
pub struct ClaimValuation {
    pub claim_id: Uuid,
    pub status: i16,
    pub review_status: i16,
    pub approved: Option<Decimal>,
    /// `(detail_id, price_approved)` per line
    pub detail_prices: Vec<(i64, Option<Decimal>)>,
}
