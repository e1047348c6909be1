//! Property-Based Test Generators
//!
//! Proptest strategies for household, policy and claim data.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_claims::ClaimStatus;
use domain_household::InsureeDetails;
use domain_policy::PolicyDates;

use crate::fixtures::{DateFixtures, HouseholdFixtures};

/// Strategy for valid chfIds (digits, 9 characters)
pub fn chf_id_strategy() -> impl Strategy<Value = String> {
    "[0-9]{9}"
}

/// Strategy for dates of birth between 1930 and [`DateFixtures::today`]
pub fn dob_strategy() -> impl Strategy<Value = NaiveDate> {
    let earliest = NaiveDate::from_ymd_opt(1930, 1, 1).unwrap();
    let span = (DateFixtures::today() - earliest).num_days();
    (0..=span).prop_map(move |days| earliest + Duration::days(days))
}

/// Strategy for valid insuree details
pub fn insuree_details_strategy() -> impl Strategy<Value = InsureeDetails> {
    (chf_id_strategy(), dob_strategy())
        .prop_map(|(chf_id, dob)| HouseholdFixtures::born_on(&chf_id, dob))
}

/// Strategy for correctly ordered policy dates around 2024
pub fn ordered_policy_dates_strategy() -> impl Strategy<Value = PolicyDates> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    (0i64..730, 0i64..30, 0i64..30, 1i64..730).prop_map(move |(enroll, start, effective, length)| {
        let enroll_date = base + Duration::days(enroll);
        let start_date = enroll_date + Duration::days(start);
        let effective_date = start_date + Duration::days(effective);
        PolicyDates {
            enroll_date,
            start_date,
            effective_date,
            expiry_date: effective_date + Duration::days(length),
        }
    })
}

/// Strategy for policy dates in any order
pub fn any_policy_dates_strategy() -> impl Strategy<Value = PolicyDates> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    (0i64..400, 0i64..400, 0i64..400, 0i64..400).prop_map(move |(a, b, c, d)| PolicyDates {
        enroll_date: base + Duration::days(a),
        start_date: base + Duration::days(b),
        effective_date: base + Duration::days(c),
        expiry_date: base + Duration::days(d),
    })
}

/// Strategy for every claim status
pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    prop_oneof![
        Just(ClaimStatus::Entered),
        Just(ClaimStatus::Checked),
        Just(ClaimStatus::Processed),
        Just(ClaimStatus::Valuated),
        Just(ClaimStatus::Rejected),
    ]
}

/// Strategy for positive amounts with two decimal places
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}
