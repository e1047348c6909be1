//! Policy domain errors
//!
//! This module defines all error types that can occur within the
//! coverage domain.

use thiserror::Error;

use core_kernel::{CoreError, FieldError};

use crate::aggregate::PolicyStatus;

/// Errors that can occur in the policy domain
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Required field is missing
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Field-level validation failures
    #[error("Invalid policy data: {0:?}")]
    Validation(Vec<FieldError>),

    /// Operation not allowed in the policy's current status
    #[error("Cannot {operation} a policy that is {status}")]
    InvalidStatus {
        operation: String,
        status: PolicyStatus,
    },

    /// Reinstatement of a policy that is not suspended
    #[error("Policy {0} is not suspended")]
    NotSuspended(String),
}

impl From<PolicyError> for CoreError {
    fn from(error: PolicyError) -> Self {
        match error {
            PolicyError::MissingRequiredField(field) => {
                let message = format!("{} is required", field);
                CoreError::validation_field(field, message)
            }
            PolicyError::Validation(errors) => CoreError::Validation(errors),
            err => CoreError::invalid_state_field("status", err.to_string()),
        }
    }
}
