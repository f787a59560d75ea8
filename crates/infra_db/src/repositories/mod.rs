//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and plain
//! row structs. Functions that must join a caller's transaction take a
//! `&mut PgConnection`; read-only lookups run on the pool.

pub mod claims;
pub mod sampling;
pub mod tasks;

pub use claims::ClaimsRepository;
pub use sampling::SamplingRepository;
pub use tasks::TasksRepository;
