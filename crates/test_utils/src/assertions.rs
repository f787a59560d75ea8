//! Custom Test Assertions
//!
//! Assertion helpers for sampling batches that give more meaningful error
//! messages than standard assertions.

use rust_decimal::Decimal;

use domain_sampling::{AssignmentStatus, BatchClaim, Claim, ReviewStatus};

/// Asserts how many assignments of a batch are in each status
///
/// # Panics
///
/// Panics if any count differs
pub fn assert_assignment_counts(entries: &[BatchClaim], idle: usize, skipped: usize, reviewed: usize) {
    let count = |status: AssignmentStatus| {
        entries
            .iter()
            .filter(|e| e.assignment.status == status)
            .count()
    };
    let actual = (
        count(AssignmentStatus::Idle),
        count(AssignmentStatus::Skipped),
        count(AssignmentStatus::Reviewed),
    );
    assert_eq!(
        actual,
        (idle, skipped, reviewed),
        "Assignment counts (idle, skipped, reviewed) differ"
    );
}

/// Asserts that every claim selected for review is IDLE in the batch and
/// every other claim is SKIPPED
pub fn assert_selection_consistent(entries: &[BatchClaim]) {
    for entry in entries {
        let selected = entry.claim.review_status == ReviewStatus::Selected;
        let idle = entry.assignment.status == AssignmentStatus::Idle;
        assert_eq!(
            selected, idle,
            "Claim {} has review status {:?} but assignment status {:?}",
            entry.claim.code, entry.claim.review_status, entry.assignment.status
        );
    }
}

/// Asserts the approved amount of a claim
pub fn assert_approved(claim: &Claim, expected: Decimal) {
    assert_eq!(
        claim.approved,
        Some(expected),
        "Claim {} approved amount differs",
        claim.code
    );
}

/// Asserts that the approved amounts of `claims` add up to `total`
pub fn assert_approved_sum(claims: &[Claim], total: Decimal) {
    let sum: Decimal = claims.iter().filter_map(|c| c.approved).sum();
    assert_eq!(sum, total, "Approved amounts sum to {}, expected {}", sum, total);
}
