//! Audit log entries
//!
//! Every committed mutation appends one entry per touched entity, in the
//! same unit of work as the change itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AuditEntryId, OperationContext};

/// Kind of entity an audit entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Family,
    Insuree,
    Membership,
    Policy,
    Claim,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Family => "FAMILY",
            EntityKind::Insuree => "INSUREE",
            EntityKind::Membership => "MEMBERSHIP",
            EntityKind::Policy => "POLICY",
            EntityKind::Claim => "CLAIM",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    /// Operation name, e.g. `transferFamilyMember`
    pub action: String,
    pub actor: String,
    pub correlation_id: Option<String>,
    pub at: DateTime<Utc>,
    pub summary: String,
}

impl AuditEntry {
    pub fn record(
        ctx: &OperationContext,
        action: &str,
        entity_kind: EntityKind,
        entity_id: impl fmt::Display,
        summary: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            entity_kind,
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            actor: ctx.actor.as_str().to_string(),
            correlation_id: ctx.correlation_id.clone(),
            at,
            summary: summary.into(),
        }
    }
}
