//! Household domain errors

use thiserror::Error;

use core_kernel::{CoreError, FieldError};

/// Errors that can occur in the household domain
#[derive(Debug, Error)]
pub enum HouseholdError {
    #[error("Invalid household data: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("Invalid insuree status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Insuree {0} is not active")]
    InsureeNotActive(String),

    #[error("Family {0} is not active")]
    FamilyInactive(String),

    #[error("Membership {0} is not active")]
    MembershipNotActive(String),

    #[error("Insuree {insuree} already has an active membership in family {family}")]
    AlreadyMember { insuree: String, family: String },

    #[error("Insuree {insuree} is not an active member of family {family}")]
    NotAMember { insuree: String, family: String },

    #[error("Family {family} already has an active head ({head})")]
    HeadAlreadyAssigned { family: String, head: String },

    #[error("Member is already in family {0}")]
    SameFamily(String),

    #[error("Head-of-family invariant violated for family {family}: {reason}")]
    HeadInvariant { family: String, reason: String },
}

impl HouseholdError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        HouseholdError::Validation(vec![FieldError::validation(field, message)])
    }

    pub fn head_invariant(family: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        HouseholdError::HeadInvariant {
            family: family.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<HouseholdError> for CoreError {
    fn from(error: HouseholdError) -> Self {
        match error {
            HouseholdError::Validation(errors) => CoreError::Validation(errors),
            err @ HouseholdError::HeadAlreadyAssigned { .. } => {
                CoreError::invalid_state_field("isHead", err.to_string())
            }
            err @ HouseholdError::InvalidStatusTransition { .. } => {
                CoreError::invalid_state_field("status", err.to_string())
            }
            err => CoreError::invalid_state(err.to_string()),
        }
    }
}
