//! Claim aggregate

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use core_kernel::validation::field_errors;
use core_kernel::{Actor, AuditStamp, ClaimId, ClaimStatusChangeId, FieldError, InsureeId};

use crate::error::ClaimError;
use crate::history::ClaimStatusChange;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Submitted, awaiting checks
    Entered,
    /// Passed administrative checks
    Checked,
    /// Medically reviewed
    Processed,
    /// Amounts settled (terminal)
    Valuated,
    /// Refused (terminal)
    Rejected,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Entered => "ENTERED",
            ClaimStatus::Checked => "CHECKED",
            ClaimStatus::Processed => "PROCESSED",
            ClaimStatus::Valuated => "VALUATED",
            ClaimStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ENTERED" => Some(ClaimStatus::Entered),
            "CHECKED" => Some(ClaimStatus::Checked),
            "PROCESSED" => Some(ClaimStatus::Processed),
            "VALUATED" => Some(ClaimStatus::Valuated),
            "REJECTED" => Some(ClaimStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStatus::Valuated | ClaimStatus::Rejected)
    }

    /// Checks if a transition is allowed
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (*self, target),
            (Entered, Checked)
                | (Checked, Processed)
                | (Processed, Valuated)
                | (Entered, Rejected)
                | (Checked, Rejected)
                | (Processed, Rejected)
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of facility visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    Emergency,
    Routine,
    Referral,
}

impl VisitType {
    pub fn code(&self) -> &'static str {
        match self {
            VisitType::Emergency => "E",
            VisitType::Routine => "R",
            VisitType::Referral => "O",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(VisitType::Emergency),
            "R" => Some(VisitType::Routine),
            "O" => Some(VisitType::Referral),
            _ => None,
        }
    }
}

/// Input for submitting a claim
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewClaim {
    pub insuree_id: InsureeId,
    #[validate(length(min = 1, max = 8))]
    pub facility_code: String,
    pub claim_date: NaiveDate,
    pub visit_date: NaiveDate,
    pub visit_type: VisitType,
    pub claimed: Decimal,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub diagnosis: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub explanation: Option<String>,
}

impl NewClaim {
    /// Checks field shape, dates and the claimed amount
    pub fn check(&self, today: NaiveDate) -> Result<(), ClaimError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        if self.claim_date > today {
            errors.push(FieldError::validation("claimDate", "claimDate cannot be in the future"));
        }
        if self.visit_date > self.claim_date {
            errors.push(FieldError::validation(
                "visitDate",
                "visitDate must not be after claimDate",
            ));
        }
        if self.claimed <= Decimal::ZERO {
            errors.push(FieldError::validation("claimed", "claimed must be positive"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClaimError::Validation(errors))
        }
    }
}

/// Monetary fields supplied with a status transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaimAmounts {
    pub approved: Option<Decimal>,
    pub valuated: Option<Decimal>,
    pub reimbursed: Option<Decimal>,
}

/// A reimbursement request for a facility visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: ClaimId,
    /// Unique human-readable code
    pub code: String,
    pub insuree_id: InsureeId,
    /// Upper-case facility code
    pub facility_code: String,
    pub claim_date: NaiveDate,
    pub visit_date: NaiveDate,
    pub visit_type: VisitType,
    pub diagnosis: Option<String>,
    pub explanation: Option<String>,
    pub status: ClaimStatus,
    pub claimed: Decimal,
    pub approved: Option<Decimal>,
    pub rejected: Option<Decimal>,
    pub valuated: Option<Decimal>,
    pub reimbursed: Option<Decimal>,
    pub rejection_reason: Option<String>,
    pub audit: AuditStamp,
}

impl Claim {
    /// Creates an ENTERED claim; input must already be checked
    pub fn submit(new: NewClaim, code_prefix: &str, actor: &Actor, at: DateTime<Utc>) -> Self {
        let id = ClaimId::new();
        Self {
            code: generate_claim_code(code_prefix, new.claim_date, id),
            id,
            insuree_id: new.insuree_id,
            facility_code: new.facility_code.trim().to_uppercase(),
            claim_date: new.claim_date,
            visit_date: new.visit_date,
            visit_type: new.visit_type,
            diagnosis: new.diagnosis,
            explanation: new.explanation,
            status: ClaimStatus::Entered,
            claimed: new.claimed,
            approved: None,
            rejected: None,
            valuated: None,
            reimbursed: None,
            rejection_reason: None,
            audit: AuditStamp::new(actor, at),
        }
    }

    /// Applies one status transition
    ///
    /// # Arguments
    ///
    /// * `target` - The requested status
    /// * `amounts` - Monetary fields to record with the transition
    /// * `reason` - Required when rejecting
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` for a transition outside the status
    /// machine and `Validation` for inconsistent amounts. The claim is left
    /// unchanged on error.
    pub fn transition(
        &mut self,
        target: ClaimStatus,
        amounts: ClaimAmounts,
        reason: Option<String>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<ClaimStatusChange, ClaimError> {
        if !self.status.can_transition_to(target) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status,
                to: target,
            });
        }

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if target == ClaimStatus::Rejected {
            if reason.is_none() {
                return Err(ClaimError::field("reason", "a reason is required to reject a claim"));
            }
        } else {
            self.check_amounts(target, &amounts)?;
        }

        let from = self.status;
        match target {
            ClaimStatus::Rejected => {
                self.rejected = Some(self.claimed);
                self.rejection_reason = reason.clone();
            }
            _ => {
                if amounts.approved.is_some() {
                    self.approved = amounts.approved;
                }
                if amounts.valuated.is_some() {
                    self.valuated = amounts.valuated;
                }
                if amounts.reimbursed.is_some() {
                    self.reimbursed = amounts.reimbursed;
                }
            }
        }
        self.status = target;
        self.audit.touch(actor, at);

        Ok(ClaimStatusChange {
            id: ClaimStatusChangeId::new(),
            claim_id: self.id,
            from_status: from,
            to_status: target,
            changed_by: actor.as_str().to_string(),
            changed_at: at,
            reason,
        })
    }

    fn check_amounts(&self, target: ClaimStatus, amounts: &ClaimAmounts) -> Result<(), ClaimError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("approved", amounts.approved),
            ("valuated", amounts.valuated),
            ("reimbursed", amounts.reimbursed),
        ] {
            if value.is_some_and(|v| v.is_sign_negative()) {
                errors.push(FieldError::validation(field, format!("{} must not be negative", field)));
            }
        }

        let approved = amounts.approved.or(self.approved);
        if approved.is_some_and(|a| a > self.claimed) {
            errors.push(FieldError::validation("approved", "approved must not exceed claimed"));
        }

        let valuated = amounts.valuated.or(self.valuated);
        if target == ClaimStatus::Valuated && valuated.is_none() {
            errors.push(FieldError::validation("valuated", "valuated is required to valuate a claim"));
        }
        if let Some(reimbursed) = amounts.reimbursed.or(self.reimbursed) {
            match valuated {
                Some(v) if reimbursed <= v => {}
                Some(_) => errors.push(FieldError::validation(
                    "reimbursed",
                    "reimbursed must not exceed valuated",
                )),
                None => errors.push(FieldError::validation(
                    "reimbursed",
                    "reimbursed requires a valuated amount",
                )),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClaimError::Validation(errors))
        }
    }
}

/// Builds a claim code such as `CLM-2024-0F3A9C21B7D4`
///
/// The suffix is taken from the random tail of the time-ordered id.
pub fn generate_claim_code(prefix: &str, claim_date: NaiveDate, id: ClaimId) -> String {
    let simple = id.as_uuid().simple().to_string().to_uppercase();
    format!("{}-{}-{}", prefix, claim_date.year(), &simple[20..])
}
