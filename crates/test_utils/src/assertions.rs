//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_claims::{Claim, ClaimStatus, LiabilityEvaluation};

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a confidence score lies in [0, 1]
pub fn assert_confidence(value: f64) {
    assert!(
        (0.0..=1.0).contains(&value),
        "Confidence out of range: {}",
        value
    );
}

/// Asserts that a claim is in the expected status
pub fn assert_claim_status(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "Claim {} is {}, expected {} (rejection reason: {:?})",
        claim.claim_number, claim.status, expected, claim.rejection_reason
    );
}

/// Asserts the invariants every liability evaluation keeps
///
/// The payout is never negative and never above the product limit, and the
/// confidence is at least 0.1.
pub fn assert_evaluation_consistent(evaluation: &LiabilityEvaluation) {
    assert!(
        !evaluation.recommended_payout.amount().is_sign_negative(),
        "Negative payout: {}",
        evaluation.recommended_payout
    );
    if let Some(limit) = &evaluation.coverage_limit {
        assert!(
            evaluation.recommended_payout.amount() <= limit.amount(),
            "Payout {} exceeds limit {}",
            evaluation.recommended_payout,
            limit
        );
    }
    assert!(
        evaluation.confidence >= 0.1,
        "Confidence below floor: {}",
        evaluation.confidence
    );
    assert_confidence(evaluation.confidence);
    if !evaluation.coverage_applicable || !evaluation.exclusion_factors.is_empty() {
        assert!(
            evaluation.recommended_payout.is_zero(),
            "Uncovered claim pays {}",
            evaluation.recommended_payout
        );
    }
}
