//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for unit and service tests. All dates are
//! relative to [`DateFixtures::today`], which is also the date of
//! [`DateFixtures::clock`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use core_kernel::{
    Actor, AuthorizationDecision, FamilyId, FixedClock, InsureeId, OperationContext,
};
use domain_household::{FamilyDetails, InsureeDetails};
use domain_reference::StaticReferenceData;

/// Fixture for dates
pub struct DateFixtures;

impl DateFixtures {
    /// The fixed "today" used by service tests (June 15, 2024)
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// A clock fixed at midday of [`Self::today`]
    pub fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::on(Self::today()))
    }

    /// Date of birth of a 44-year-old adult
    pub fn adult_dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(1980, 3, 10).unwrap()
    }

    /// Date of birth of a 10-year-old child
    pub fn child_dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 1, 20).unwrap()
    }

    /// Coverage window starting this year
    pub fn policy_year() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// A family id that no store contains
    pub fn unknown_family_id() -> FamilyId {
        FamilyId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// An insuree id that no store contains
    pub fn unknown_insuree_id() -> InsureeId {
        InsureeId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }
}

/// Fixture for operation contexts
pub struct ContextFixtures;

impl ContextFixtures {
    /// An enrolment officer allowed to do anything
    pub fn clerk() -> OperationContext {
        OperationContext::for_actor(Actor::new("enrolment-officer"))
            .with_correlation_id("test-correlation")
    }

    /// A caller whose request was refused by the authorization layer
    pub fn denied() -> OperationContext {
        OperationContext::for_actor(Actor::new("visitor")).with_authorization(
            AuthorizationDecision::Denied {
                reason: "missing permission".to_string(),
            },
        )
    }
}

static BUILTIN_REFERENCE: Lazy<Arc<StaticReferenceData>> =
    Lazy::new(|| Arc::new(StaticReferenceData::builtin()));

/// Fixture for reference data
pub struct ReferenceFixtures;

impl ReferenceFixtures {
    /// The built-in tables, shared across tests
    pub fn builtin() -> Arc<StaticReferenceData> {
        BUILTIN_REFERENCE.clone()
    }

    /// An active facility code of the built-in tables
    pub fn active_facility() -> &'static str {
        "HF-001"
    }

    /// A facility present but inactive in the built-in tables
    pub fn inactive_facility() -> &'static str {
        "HF-099"
    }

    pub fn spouse() -> &'static str {
        "RL-001"
    }

    pub fn son() -> &'static str {
        "RL-005"
    }
}

/// Fixture for household inputs
pub struct HouseholdFixtures;

impl HouseholdFixtures {
    /// A valid family at village level with a confirmation number
    pub fn family(confirmation_no: &str) -> FamilyDetails {
        FamilyDetails {
            address: Some("12 Market Road".to_string()),
            ethnicity: None,
            confirmation_type: Some("NID".to_string()),
            confirmation_no: Some(confirmation_no.to_string()),
            family_type_code: Some("GP-001".to_string()),
            location_code: Some("R1D1M1V1".to_string()),
            poverty: false,
        }
    }

    /// A valid adult insuree
    pub fn adult(chf_id: &str) -> InsureeDetails {
        InsureeDetails {
            chf_id: chf_id.to_string(),
            last_name: "Mwangi".to_string(),
            other_names: "Amani".to_string(),
            gender_code: "F".to_string(),
            dob: DateFixtures::adult_dob(),
            marital_status: None,
            phone: Some("+255700000001".to_string()),
            email: None,
            current_address: None,
            profession_code: None,
            location_code: Some("R1D1M1V1".to_string()),
        }
    }

    /// A valid insuree born on `dob`
    pub fn born_on(chf_id: &str, dob: NaiveDate) -> InsureeDetails {
        InsureeDetails {
            dob,
            ..Self::adult(chf_id)
        }
    }
}

/// Fixture for amounts
pub struct AmountFixtures;

impl AmountFixtures {
    pub fn policy_value() -> Decimal {
        dec!(120000.00)
    }

    pub fn claimed() -> Decimal {
        dec!(250.00)
    }
}
