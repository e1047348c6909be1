//! Input shape validation
//!
//! Input structs derive [`validator::Validate`]; this module turns the
//! validator's report into the field-level errors carried by results.

use validator::{Validate, ValidationErrors};

use crate::error::{CoreError, FieldError};

/// Validates an input struct, mapping failures to a validation error
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(field_errors(&errors)))
}

/// Flattens validator errors into camelCase field errors, sorted by field
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut result: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, failures)| {
            let field = camel_case(&field.to_string());
            failures.iter().map(move |failure| {
                let message = match &failure.message {
                    Some(message) => message.to_string(),
                    None => format!("failed {} check", failure.code),
                };
                FieldError::validation(field.clone(), message)
            })
        })
        .collect();
    result.sort_by(|a, b| a.field.cmp(&b.field));
    result
}

/// Converts a snake_case identifier to camelCase
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
