//! Claim status history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ClaimStatusChangeId};

use crate::claim::ClaimStatus;

/// One committed status transition of a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusChange {
    pub id: ClaimStatusChangeId,
    pub claim_id: ClaimId,
    pub from_status: ClaimStatus,
    pub to_status: ClaimStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Returns true if the history is a valid walk of the status machine
/// starting from ENTERED
pub fn is_valid_path(history: &[ClaimStatusChange]) -> bool {
    let mut current = ClaimStatus::Entered;
    for change in history {
        if change.from_status != current || !current.can_transition_to(change.to_status) {
            return false;
        }
        current = change.to_status;
    }
    true
}
