//! Database Test Utilities
//!
//! Provides helpers for database testing including testcontainer management
//! and seeding of the claim tables the sampling adapters read.

use std::sync::Arc;

use sqlx::PgPool;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use domain_sampling::{Claim, DetailKind};
use infra_db::DatabaseConfig;

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "claim_sampling_test";

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container and applies the migrations
    pub async fn new() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        let pool = infra_db::create_pool(
            DatabaseConfig::new(config.connection_url()).max_connections(5).min_connections(1),
        )
        .await?;

        infra_db::run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Clears all data while preserving the schema
    pub async fn clear_data(&self) -> TestResult<()> {
        let tables = [
            "tasks",
            "claim_sampling_batch_assignments",
            "claim_sampling_batch_history",
            "claim_sampling_batches",
            "claim_details",
            "claims",
        ];

        for table in tables {
            sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Inserts a claim and its lines
    ///
    /// Line ids are assigned by the database; the returned claim carries them.
    pub async fn seed_claim(&self, claim: &Claim) -> TestResult<Claim> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO claims (\
                claim_id, claim_code, status, review_status, health_facility_id, insuree_id, \
                admin_id, care_type, visit_type, date_from, date_to, date_claimed, claimed, \
                approved, attachments_count, restored_from, recorded_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(Uuid::from(claim.id))
        .bind(&claim.code)
        .bind(claim.status.code())
        .bind(claim.review_status.code())
        .bind(claim.health_facility_id)
        .bind(claim.insuree_id)
        .bind(claim.admin_id.map(Uuid::from))
        .bind(&claim.care_type)
        .bind(&claim.visit_type)
        .bind(claim.date_from)
        .bind(claim.date_to)
        .bind(claim.date_claimed)
        .bind(claim.claimed)
        .bind(claim.approved)
        .bind(claim.attachments_count as i32)
        .bind(claim.restored_from.map(Uuid::from))
        .bind(claim.system_period.recorded_at)
        .execute(&mut *tx)
        .await?;

        let mut seeded = claim.clone();
        for detail in seeded.items.iter_mut().chain(seeded.services.iter_mut()) {
            let kind = match detail.kind {
                DetailKind::Item => "item",
                DetailKind::Service => "service",
            };
            detail.id = sqlx::query_scalar(
                "INSERT INTO claim_details (\
                    claim_id, kind, code, status, qty_provided, qty_approved, \
                    price_asked, price_adjusted, price_approved, rejection_reason\
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 RETURNING detail_id",
            )
            .bind(Uuid::from(claim.id))
            .bind(kind)
            .bind(&detail.code)
            .bind(detail.status.code())
            .bind(detail.qty_provided)
            .bind(detail.qty_approved)
            .bind(detail.price_asked)
            .bind(detail.price_adjusted)
            .bind(detail.price_approved)
            .bind(detail.rejection_reason)
            .fetch_one(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(seeded)
    }
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a shared test database instance
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> TestResult<TestDatabase> {
    TestDatabase::new().await
}
