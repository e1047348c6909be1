//! Custom Test Assertions
//!
//! Assertion helpers for service results that print the full error on
//! mismatch.

use std::fmt::Debug;

use core_kernel::{CoreError, ErrorCode, OperationResult};
use domain_claims::{is_valid_path, ClaimStatusChange};
use domain_household::{check_head_invariant, Family, FamilyMembership};

/// Asserts that a result failed with the given error code
///
/// # Panics
///
/// Panics if the result is `Ok` or carries a different code
pub fn assert_error_code<T: Debug>(result: &Result<T, CoreError>, expected: ErrorCode) {
    match result {
        Ok(value) => panic!("Expected {} error, got Ok({:?})", expected, value),
        Err(error) => assert_eq!(
            error.code(),
            expected,
            "Expected {} error, got {}: {}",
            expected,
            error.code(),
            error
        ),
    }
}

/// Asserts that a failed result names `field` in its field errors
pub fn assert_error_field<T: Debug>(result: &Result<T, CoreError>, field: &str) {
    let Err(error) = result else {
        panic!("Expected an error on field {}, got {:?}", field, result);
    };
    let fields: Vec<_> = error
        .field_errors()
        .into_iter()
        .filter_map(|e| e.field)
        .collect();
    assert!(
        fields.iter().any(|f| f == field),
        "Expected an error on field {}, got fields {:?}",
        field,
        fields
    );
}

/// Asserts that an operation envelope reports failure with the given code
pub fn assert_envelope_code<T: Debug>(result: &OperationResult<T>, expected: ErrorCode) {
    assert!(!result.success, "Expected failure, got {:?}", result);
    assert!(result.data.is_none(), "Failed result carries data: {:?}", result);
    assert_eq!(
        result.error_code(),
        Some(expected),
        "Unexpected errors: {:?}",
        result.errors
    );
}

/// Asserts the head invariant for a family and its memberships
pub fn assert_head_invariant(family: &Family, memberships: &[FamilyMembership]) {
    if let Err(error) = check_head_invariant(family, memberships) {
        panic!("Head invariant violated: {}", error);
    }
}

/// Asserts that a claim history follows the claim status machine
pub fn assert_valid_claim_path(history: &[ClaimStatusChange]) {
    let path: Vec<_> = history
        .iter()
        .map(|c| format!("{}->{}", c.from_status, c.to_status))
        .collect();
    assert!(is_valid_path(history), "Invalid claim history: {:?}", path);
}
