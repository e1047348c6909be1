//! Per-request operation context
//!
//! Authorization is decided outside the core (by the API layer). The core
//! only receives the decision and refuses to proceed when it is a denial.

use serde::{Deserialize, Serialize};

use crate::audit::Actor;
use crate::error::CoreError;

/// Authorization decision made by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthorizationDecision {
    Allowed,
    Denied { reason: String },
}

/// Metadata about an operation for auditing and tracing
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// User or system that initiated the operation
    pub actor: Actor,
    /// Correlation ID for tracing across systems
    pub correlation_id: Option<String>,
    /// Decision for this particular operation
    pub authorization: AuthorizationDecision,
}

impl OperationContext {
    /// Context for an authorized actor
    pub fn for_actor(actor: Actor) -> Self {
        Self {
            actor,
            correlation_id: None,
            authorization: AuthorizationDecision::Allowed,
        }
    }

    /// Context for internal maintenance tasks
    pub fn system() -> Self {
        Self::for_actor(Actor::system())
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_authorization(mut self, authorization: AuthorizationDecision) -> Self {
        self.authorization = authorization;
        self
    }

    /// Fails with `PERMISSION_DENIED` unless the decision allows the operation
    pub fn ensure_authorized(&self, operation: &str) -> Result<(), CoreError> {
        match &self.authorization {
            AuthorizationDecision::Allowed => Ok(()),
            AuthorizationDecision::Denied { reason } => Err(CoreError::permission_denied(format!(
                "{} may not perform {}: {}",
                self.actor, operation, reason
            ))),
        }
    }
}
