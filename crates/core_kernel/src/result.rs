//! Structured success/failure envelope returned across the core boundary

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ErrorCode, FieldError};

/// Result of a service operation as seen by an API layer
///
/// Carries either the created/updated entity or a list of field-level
/// errors. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failure(error: &CoreError) -> Self {
        Self {
            success: false,
            data: None,
            errors: error.field_errors(),
        }
    }

    /// Returns the code of the first error, if the operation failed
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.errors.first().map(|e| e.code)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            success: self.success,
            data: self.data.map(f),
            errors: self.errors,
        }
    }
}

impl<T> From<Result<T, CoreError>> for OperationResult<T> {
    fn from(result: Result<T, CoreError>) -> Self {
        match result {
            Ok(data) => OperationResult::ok(data),
            Err(error) => OperationResult::failure(&error),
        }
    }
}
