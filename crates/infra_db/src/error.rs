//! Database error types
//!
//! SQLx errors are classified by PostgreSQL error code and constraint name,
//! then mapped onto [`PortError`] for the service layer.

use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

use core_kernel::PortError;

/// Unique constraints guarding a business identifier, with the input field they protect
const UNIQUE_FIELDS: [(&str, &str); 3] = [
    ("insurees_chf_id_key", "chfId"),
    ("families_confirmation_no_key", "confirmationNo"),
    ("claims_code_key", "code"),
];

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A business identifier is already taken
    #[error("Duplicate entry: {field} '{value}'")]
    DuplicateEntry { field: String, value: String },

    /// A membership invariant index rejected the write
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Serialization failure or deadlock; the transaction may be retried
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// A row lock was not granted within the lock timeout
    #[error("Lock not available: {0}")]
    LockTimeout(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value does not map onto a domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    pub fn corrupt(table: &str, column: &str, value: impl std::fmt::Display) -> Self {
        DatabaseError::CorruptRow(format!("{}.{} holds unknown value '{}'", table, column, value))
    }
}

/// Maps SQLx errors onto specific variants by PostgreSQL error code
///
/// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => unique_violation(
                        db_err.constraint(),
                        db_err
                            .try_downcast_ref::<PgDatabaseError>()
                            .and_then(|pg| pg.detail()),
                        message,
                    ),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("40001") | Some("40P01") => DatabaseError::TransactionConflict(message),
                    Some("55P03") => DatabaseError::LockTimeout(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

fn unique_violation(constraint: Option<&str>, detail: Option<&str>, message: String) -> DatabaseError {
    let field = constraint.and_then(|name| {
        UNIQUE_FIELDS
            .iter()
            .find(|(constraint, _)| *constraint == name)
            .map(|(_, field)| *field)
    });
    match field {
        Some(field) => DatabaseError::DuplicateEntry {
            field: field.to_string(),
            value: detail.and_then(key_value).unwrap_or_default().to_string(),
        },
        None => DatabaseError::InvariantViolation(message),
    }
}

/// Extracts `value` from a detail such as `Key (chf_id)=(value) already exists.`
fn key_value(detail: &str) -> Option<&str> {
    let start = detail.find(")=(")? + 3;
    let end = detail[start..].find(')')? + start;
    Some(&detail[start..end])
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::DuplicateEntry { field, value } => PortError::duplicate(field, value),
            DatabaseError::InvariantViolation(message) => PortError::conflict(message),
            DatabaseError::TransactionConflict(message) => {
                PortError::TransactionConflict { message }
            }
            DatabaseError::LockTimeout(message) => PortError::Timeout {
                operation: message,
                duration_ms: 0,
            },
            DatabaseError::ConnectionFailed(message) => PortError::connection(message),
            DatabaseError::PoolExhausted => PortError::connection("connection pool exhausted"),
            DatabaseError::CorruptRow(message) => PortError::transformation(message),
            other => PortError::internal(other.to_string()),
        }
    }
}
