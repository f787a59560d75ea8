//! Versioning periods for history-keeping records
//!
//! Sampling batches, assignments and the claims they reference are never
//! physically deleted. Each stored row carries a system period:
//! - `recorded_at`: when this version of the row was written
//! - `superseded_at`: when it was replaced by a newer version or soft-deleted
//!
//! Only rows with an open system period are "current".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Record already superseded at {0}")]
    AlreadySuperseded(String),
}

/// Represents a system time period (when a version of a record was current)
///
/// This is used for audit trails to track when data was entered, modified
/// or soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPeriod {
    /// When the record was created
    pub recorded_at: DateTime<Utc>,
    /// When the record was superseded (None means current)
    pub superseded_at: Option<DateTime<Utc>>,
}

impl SystemPeriod {
    /// Creates a new current system period
    pub fn current() -> Self {
        Self {
            recorded_at: Utc::now(),
            superseded_at: None,
        }
    }

    /// Creates a system period with a specific recorded time
    pub fn recorded_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            recorded_at: timestamp,
            superseded_at: None,
        }
    }

    /// Returns true if this is the current (non-superseded) record
    pub fn is_current(&self) -> bool {
        self.superseded_at.is_none()
    }

    /// Supersedes this record now
    pub fn supersede(&mut self) -> Result<(), TemporalError> {
        self.supersede_at(Utc::now())
    }

    /// Supersedes this record at a specific timestamp
    ///
    /// A record can only be closed once, and never before it was recorded.
    pub fn supersede_at(&mut self, timestamp: DateTime<Utc>) -> Result<(), TemporalError> {
        if let Some(existing) = self.superseded_at {
            return Err(TemporalError::AlreadySuperseded(existing.to_string()));
        }
        if timestamp < self.recorded_at {
            return Err(TemporalError::InvalidPeriod {
                start: self.recorded_at.to_string(),
                end: timestamp.to_string(),
            });
        }
        self.superseded_at = Some(timestamp);
        Ok(())
    }

    /// Returns true if this record was active at the given system time
    pub fn active_at(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.recorded_at
            && self.superseded_at.map_or(true, |s| timestamp < s)
    }
}

impl Default for SystemPeriod {
    fn default() -> Self {
        Self::current()
    }
}
