//! Claims domain errors

use thiserror::Error;

use core_kernel::{CoreError, FieldError};

use crate::claim::ClaimStatus;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: ClaimStatus, to: ClaimStatus },

    #[error("Invalid claim data: {0:?}")]
    Validation(Vec<FieldError>),
}

impl ClaimError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ClaimError::Validation(vec![FieldError::validation(field, message)])
    }
}

impl From<ClaimError> for CoreError {
    fn from(error: ClaimError) -> Self {
        match error {
            ClaimError::Validation(errors) => CoreError::Validation(errors),
            err @ ClaimError::InvalidStatusTransition { .. } => {
                CoreError::invalid_state_field("status", err.to_string())
            }
        }
    }
}
