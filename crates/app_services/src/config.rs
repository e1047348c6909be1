//! Service configuration
//!
//! Passed explicitly to every service constructor at process start.

use serde::{Deserialize, Serialize};

/// What happens when a new head is requested for a family that has one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadReplacementPolicy {
    /// Fail with INVALID_STATE unless the caller sets `replaceHead`
    #[default]
    Reject,
    /// Demote the current head in the same unit of work
    AutoDemote,
}

/// Tunables for the service layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Age at which a member counts as an adult for head succession
    pub age_of_majority: u32,
    pub head_replacement: HeadReplacementPolicy,
    /// Prefix of generated claim codes
    pub claim_code_prefix: String,
    /// Retries of a unit of work after a transient store conflict
    pub max_conflict_retries: u32,
    /// Maximum wait for row locks, in milliseconds
    pub lock_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            age_of_majority: 18,
            head_replacement: HeadReplacementPolicy::Reject,
            claim_code_prefix: "CLM".to_string(),
            max_conflict_retries: 3,
            lock_timeout_ms: 5_000,
        }
    }
}
