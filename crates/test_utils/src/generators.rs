//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating claims and sampling inputs
//! that maintain domain invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_sampling::Claim;

use crate::builders::TestClaimBuilder;

/// Strategy for valid sampling percentages
pub fn percentage_strategy() -> impl Strategy<Value = i64> {
    1i64..=100
}

/// Strategy for ratios from 0 to 1 with four decimal places
pub fn ratio_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10000u32).prop_map(|n| Decimal::new(n as i64, 4))
}

/// Strategy for positive line prices with two decimal places
pub fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strategy for a checked claim with one to four item lines
pub fn claim_strategy() -> impl Strategy<Value = Claim> {
    (prop::collection::vec(price_strategy(), 1..=4), 0u32..10000).prop_map(|(prices, n)| {
        prices
            .into_iter()
            .fold(TestClaimBuilder::new().with_code(format!("CLM-{n:04}")), |builder, price| {
                builder.with_item(price)
            })
            .build()
    })
}

/// Strategy for a pool of candidate claims
pub fn claim_pool_strategy(max: usize) -> impl Strategy<Value = Vec<Claim>> {
    prop::collection::vec(claim_strategy(), 1..=max)
}
