//! Authentication and authorization
//!
//! Tokens carry roles; each role grants a fixed set of [`Permission`]s.
//! The decision for a request is made here and handed to the services
//! inside the `OperationContext`.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use app_services::Permission;
use core_kernel::AuthorizationDecision;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
}

/// Role names
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const ENROLMENT_OFFICER: &str = "enrolment_officer";
    pub const CLAIM_ADMINISTRATOR: &str = "claim_administrator";
    pub const MEDICAL_OFFICER: &str = "medical_officer";
    pub const VIEWER: &str = "viewer";
}

const READ_ONLY: &[Permission] = &[
    Permission::HouseholdRead,
    Permission::PolicyRead,
    Permission::ClaimRead,
];

/// Permissions granted by a role
pub fn role_permissions(role: &str) -> &'static [Permission] {
    match role {
        roles::ADMIN => &[
            Permission::HouseholdRead,
            Permission::HouseholdWrite,
            Permission::PolicyRead,
            Permission::PolicyWrite,
            Permission::ClaimRead,
            Permission::ClaimSubmit,
            Permission::ClaimProcess,
        ],
        roles::ENROLMENT_OFFICER => &[
            Permission::HouseholdRead,
            Permission::HouseholdWrite,
            Permission::PolicyRead,
            Permission::PolicyWrite,
        ],
        roles::CLAIM_ADMINISTRATOR => &[
            Permission::HouseholdRead,
            Permission::PolicyRead,
            Permission::ClaimRead,
            Permission::ClaimSubmit,
        ],
        roles::MEDICAL_OFFICER => &[Permission::ClaimRead, Permission::ClaimProcess],
        roles::VIEWER => READ_ONLY,
        _ => &[],
    }
}

/// Decides whether the token holder may use a permission
pub fn authorize(claims: &Claims, permission: Permission) -> AuthorizationDecision {
    let granted = claims
        .roles
        .iter()
        .any(|role| role_permissions(role).contains(&permission));
    if granted {
        AuthorizationDecision::Allowed
    } else {
        AuthorizationDecision::Denied {
            reason: format!("missing permission {}", permission),
        }
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
