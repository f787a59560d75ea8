//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for claim sampling, built on SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: SQL and row types
//! - [`adapters`]: implementations of the `domain_sampling` ports
//! - [`pool`]: connection pool configuration and migrations
//!
//! Sampling batches keep a history: each update copies the current version
//! to a history table before rewriting it.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool_from_url, run_migrations, adapters::PostgresSamplingStore};
//!
//! let pool = create_pool_from_url("postgres://localhost/claim_sampling").await?;
//! run_migrations(&pool).await?;
//! let store = PostgresSamplingStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresClaimAdapter, PostgresSamplingStore};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
