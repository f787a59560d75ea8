//! Core Kernel - Foundational types and utilities for the claims sampling system
//!
//! This crate provides the fundamental building blocks used across all modules:
//! - Strongly-typed identifiers for claims, batches, assignments and tasks
//! - Versioning periods for soft-deleted, history-keeping records
//! - Port infrastructure shared by every adapter

pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use temporal::{SystemPeriod, TemporalError};
pub use identifiers::{
    ClaimId, ClaimAdminId, SamplingBatchId, AssignmentId,
    TaskId, TaskGroupId, UserId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult,
    AdapterHealth, OperationMetadata,
};
