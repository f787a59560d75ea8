//! Random allocation of review labels
//!
//! Counts are computed deterministically from the inputs. Only the placement
//! of the labels is random: the labels are laid out in two runs and then
//! shuffled uniformly.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sampling label for one candidate claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleLabel {
    Selected,
    NotSelected,
}

/// Extrapolation bucket for one unreviewed claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeductibleLabel {
    Approve,
    Reject,
}

/// Number of claims selected for review out of `total`
///
/// Floors `total * percentage / 100` and never returns zero for a
/// non-empty pool.
pub fn selected_count(total: usize, percentage: u32) -> usize {
    let selected = (total.saturating_mul(percentage as usize) / 100).min(total);
    if selected == 0 && total > 0 {
        1
    } else {
        selected
    }
}

/// Number of unreviewed claims approved for a deductible ratio
///
/// The ratio is clamped to `[0, 1]`. A positive ratio approves at least one claim.
pub fn approved_count(total: usize, ratio: Decimal) -> usize {
    let ratio = ratio.clamp(Decimal::ZERO, Decimal::ONE);
    let approved = (ratio * Decimal::from(total))
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(total);
    if approved == 0 && total > 0 && ratio > Decimal::ZERO {
        1
    } else {
        approved
    }
}

fn shuffled_runs<T: Copy, R: Rng + ?Sized>(
    rng: &mut R,
    first: T,
    first_count: usize,
    second: T,
    second_count: usize,
) -> Vec<T> {
    let mut labels = Vec::with_capacity(first_count + second_count);
    labels.extend(std::iter::repeat(first).take(first_count));
    labels.extend(std::iter::repeat(second).take(second_count));
    labels.shuffle(rng);
    labels
}

/// Allocates `total` sampling labels using the given random source
pub fn allocate_with<R: Rng + ?Sized>(rng: &mut R, total: usize, percentage: u32) -> Vec<SampleLabel> {
    let selected = selected_count(total, percentage);
    shuffled_runs(
        rng,
        SampleLabel::Selected,
        selected,
        SampleLabel::NotSelected,
        total - selected,
    )
}

/// Splits `total` unreviewed claims into approve and reject buckets
pub fn allocate_deductible_with<R: Rng + ?Sized>(
    rng: &mut R,
    total: usize,
    ratio: Decimal,
) -> Vec<DeductibleLabel> {
    let approved = approved_count(total, ratio);
    shuffled_runs(
        rng,
        DeductibleLabel::Approve,
        approved,
        DeductibleLabel::Reject,
        total - approved,
    )
}

/// Allocator owning its random source
///
/// Seed it for reproducible runs; the default draws from OS entropy.
#[derive(Debug)]
pub struct RandomAllocator {
    rng: Mutex<StdRng>,
}

impl RandomAllocator {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Seeded when a seed is configured, from entropy otherwise
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Allocates `total` sampling labels for the given percentage
    ///
    /// Percentage bounds are the caller's responsibility.
    pub fn allocate(&self, total: usize, percentage: u32) -> Vec<SampleLabel> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        allocate_with(&mut *rng, total, percentage)
    }

    pub fn allocate_deductible(&self, total: usize, ratio: Decimal) -> Vec<DeductibleLabel> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        allocate_deductible_with(&mut *rng, total, ratio)
    }
}

impl Default for RandomAllocator {
    fn default() -> Self {
        Self::from_entropy()
    }
}
