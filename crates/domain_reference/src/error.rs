//! Reference data loading errors

use thiserror::Error;

/// Errors raised while loading reference tables
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Malformed reference document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Duplicate {kind} code: {code}")]
    DuplicateCode { kind: String, code: String },

    #[error("Location {code} references unknown parent {parent}")]
    UnknownParent { code: String, parent: String },

    #[error("Location {code} must sit one level below its parent {parent}")]
    InvalidHierarchy { code: String, parent: String },

    #[error("Health facility {code} references unknown location {location}")]
    UnknownFacilityLocation { code: String, location: String },
}
