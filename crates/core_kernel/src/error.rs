//! Core error taxonomy shared by every service operation
//!
//! Domain crates define their own error enums and convert into [`CoreError`]
//! at the service boundary. Each variant maps onto exactly one
//! machine-readable [`ErrorCode`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ports::PortError;

/// Machine-readable error code surfaced to API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or out-of-range input, detected before any write
    ValidationError,
    /// A referenced entity does not exist
    NotFound,
    /// The caller is not allowed to perform the operation
    PermissionDenied,
    /// A uniqueness constraint would be violated
    DuplicateEntry,
    /// The operation is not legal given current entity state
    InvalidState,
    /// Infrastructure failure (store unavailable, retries exhausted)
    InternalError,
}

impl ErrorCode {
    /// Returns the wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::DuplicateEntry => "DUPLICATE_ENTRY",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level error entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Input field the error refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Machine-readable code
    pub code: ErrorCode,
}

impl FieldError {
    /// Creates an error bound to a field
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            code,
        }
    }

    /// Creates an error that is not bound to a particular field
    pub fn general(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            field: None,
            message: message.into(),
            code,
        }
    }

    /// Creates a validation error for a field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, ErrorCode::ValidationError)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error type returned by every service operation
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Duplicate entry: {field} '{value}' already exists")]
    DuplicateEntry { field: String, value: String },

    #[error("Invalid state: {message}")]
    InvalidState {
        field: Option<String>,
        message: String,
    },

    /// Store conflict that may succeed when the unit of work is retried
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Creates a validation error not bound to a field
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(vec![FieldError::general(
            message,
            ErrorCode::ValidationError,
        )])
    }

    /// Creates a validation error for a single field
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation(vec![FieldError::validation(field, message)])
    }

    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl fmt::Display) -> Self {
        CoreError::DuplicateEntry {
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        CoreError::InvalidState {
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_state_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidState {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        CoreError::PermissionDenied(message.into())
    }

    /// Returns the machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            CoreError::DuplicateEntry { .. } => ErrorCode::DuplicateEntry,
            CoreError::InvalidState { .. } => ErrorCode::InvalidState,
            CoreError::Transient(_) | CoreError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Returns true if retrying the whole unit of work may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }

    /// Flattens the error into the field-level list carried by results
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            CoreError::Validation(errors) => errors.clone(),
            CoreError::DuplicateEntry { field, .. } => {
                vec![FieldError::new(field.clone(), self.to_string(), self.code())]
            }
            CoreError::InvalidState {
                field: Some(field), ..
            } => vec![FieldError::new(field.clone(), self.to_string(), self.code())],
            _ => vec![FieldError::general(self.to_string(), self.code())],
        }
    }
}

impl From<PortError> for CoreError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Duplicate { field, value } => CoreError::DuplicateEntry { field, value },
            PortError::Conflict { message } => CoreError::invalid_state(message),
            err @ (PortError::TransactionConflict { .. }
            | PortError::Timeout { .. }
            | PortError::Connection { .. }) => CoreError::Transient(err.to_string()),
            err @ (PortError::Transformation { .. } | PortError::Internal { .. }) => {
                CoreError::Internal(err.to_string())
            }
        }
    }
}
