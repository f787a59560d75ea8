//! Domain Adapters
//!
//! PostgreSQL implementations of the sampling domain ports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresClaimAdapter, PostgresSamplingStore};
//!
//! let store = PostgresSamplingStore::new(pool.clone());
//! let claims = PostgresClaimAdapter::new(pool);
//! ```

pub mod claims;
pub mod sampling;

pub use claims::PostgresClaimAdapter;
pub use sampling::{PostgresSamplingStore, PostgresTransaction};
