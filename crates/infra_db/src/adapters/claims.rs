//! PostgreSQL Claim Adapter
//!
//! Implements the claim search and claim status ports of the sampling domain
//! on top of [`ClaimsRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimAdapter;
//! use domain_sampling::ClaimQueryPort;
//!
//! let adapter = PostgresClaimAdapter::new(pool);
//! let claims = adapter.find_claims(&filter, None).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ClaimAdminId, ClaimId, DomainPort, HealthCheckResult, HealthCheckable,
    OperationMetadata, PortError, SystemPeriod,
};
use domain_sampling::{
    Claim, ClaimDetail, ClaimFilter, ClaimIssue, ClaimQueryPort, ClaimStatus, ClaimValuationPort,
    DetailKind, DetailStatus, ReviewStatus,
};

use crate::error::DatabaseError;
use crate::repositories::claims::{ClaimDetailRow, ClaimRecord, ClaimValuation, ClaimsRepository};

/// PostgreSQL-backed claim search and claim status service
#[derive(Debug, Clone)]
pub struct PostgresClaimAdapter {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClaimAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-claim-adapter").await
    }
}

#[async_trait]
impl ClaimQueryPort for PostgresClaimAdapter {
    #[instrument(skip(self, filter, _metadata))]
    async fn find_claims(
        &self,
        filter: &ClaimFilter,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Claim>, PortError> {
        let records = self.repository.search(filter).await?;
        debug!(count = records.len(), "Claims matched filter");
        records
            .into_iter()
            .map(|record| record_to_claim(record).map_err(PortError::from))
            .collect()
    }
}

#[async_trait]
impl ClaimValuationPort for PostgresClaimAdapter {
    #[instrument(skip(self, _metadata), fields(claim_id = %claim_id))]
    async fn process_dedrem(
        &self,
        claim_id: ClaimId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<ClaimIssue>, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let claim = lock_claim(&mut tx, claim_id).await?;

        if claim.status == ClaimStatus::Rejected {
            return Ok(Vec::new());
        }
        if claim.details().next().is_none() {
            return Ok(vec![ClaimIssue {
                claim_id,
                code: "no_details".to_string(),
                message: format!("Claim {} has no items or services to process", claim.code),
            }]);
        }

        let approved = claim.approved.is_none().then(|| claim.approved_total());
        ClaimsRepository::set_status(&mut *tx, claim_id.into(), ClaimStatus::Processed.code(), approved)
            .await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(Vec::new())
    }

    #[instrument(skip(self, _metadata), fields(claim_id = %claim_id))]
    async fn reject_claim(
        &self,
        claim_id: ClaimId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<ClaimIssue>, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let mut claim = lock_claim(&mut tx, claim_id).await?;
        claim.reject_in_full();
        ClaimsRepository::save_valuation(&mut *tx, &claim_valuation(&claim)).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(Vec::new())
    }
}

async fn lock_claim(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    claim_id: ClaimId,
) -> Result<Claim, PortError> {
    let record = ClaimsRepository::lock_current(&mut **tx, &[claim_id.into()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
    Ok(record_to_claim(record)?)
}

pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}

pub(crate) fn claim_valuation(claim: &Claim) -> ClaimValuation {
    ClaimValuation {
        claim_id: claim.id.into(),
        status: claim.status.code(),
        review_status: claim.review_status.code(),
        approved: claim.approved,
        detail_prices: claim.details().map(|d| (d.id, d.price_approved)).collect(),
    }
}

pub(crate) fn record_to_claim(record: ClaimRecord) -> Result<Claim, DatabaseError> {
    let ClaimRecord { claim: row, details } = record;

    let status = ClaimStatus::from_code(row.status).ok_or_else(|| {
        DatabaseError::serialization(format!("unknown claim status {}", row.status))
    })?;
    let review_status = ReviewStatus::from_code(row.review_status).ok_or_else(|| {
        DatabaseError::serialization(format!("unknown review status {}", row.review_status))
    })?;

    let mut items = Vec::new();
    let mut services = Vec::new();
    for detail in details {
        let (kind, line) = row_to_detail(detail)?;
        match kind {
            DetailKind::Item => items.push(line),
            DetailKind::Service => services.push(line),
        }
    }

    Ok(Claim {
        id: ClaimId::from_uuid(row.claim_id),
        code: row.claim_code,
        status,
        review_status,
        health_facility_id: row.health_facility_id,
        insuree_id: row.insuree_id,
        admin_id: row.admin_id.map(ClaimAdminId::from_uuid),
        care_type: row.care_type,
        visit_type: row.visit_type,
        date_from: row.date_from,
        date_to: row.date_to,
        date_claimed: row.date_claimed,
        claimed: row.claimed,
        approved: row.approved,
        attachments_count: u32::try_from(row.attachments_count).unwrap_or(0),
        restored_from: row.restored_from.map(ClaimId::from_uuid),
        items,
        services,
        system_period: SystemPeriod {
            recorded_at: row.recorded_at,
            superseded_at: row.superseded_at,
        },
    })
}

fn row_to_detail(row: ClaimDetailRow) -> Result<(DetailKind, ClaimDetail), DatabaseError> {
    let kind = match row.kind.as_str() {
        "item" => DetailKind::Item,
        "service" => DetailKind::Service,
        other => return Err(DatabaseError::serialization(format!("unknown detail kind {other}"))),
    };
    let status = DetailStatus::from_code(row.status).ok_or_else(|| {
        DatabaseError::serialization(format!("unknown detail status {}", row.status))
    })?;

    Ok((
        kind,
        ClaimDetail {
            id: row.detail_id,
            kind,
            code: row.code,
            status,
            qty_provided: row.qty_provided,
            qty_approved: row.qty_approved,
            price_asked: row.price_asked,
            price_adjusted: row.price_adjusted,
            price_approved: row.price_approved,
            rejection_reason: row.rejection_reason,
        },
    ))
}
