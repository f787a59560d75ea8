//! Sampling configuration

use serde::{Deserialize, Serialize};

use crate::extrapolation::ExtrapolationStrategy;

/// Tunables of the sampling service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub extrapolation_strategy: ExtrapolationStrategy,
    /// Decimal places kept when a derived amount is written back
    pub amount_scale: u32,
    /// Fixed seed for reproducible allocations
    pub random_seed: Option<u64>,
    /// Source name attached to review tasks
    pub task_source: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            extrapolation_strategy: ExtrapolationStrategy::default(),
            amount_scale: 2,
            random_seed: None,
            task_source: "claim_sampling".to_string(),
        }
    }
}
