//! Family membership
//!
//! The join record between an insuree and a family. A membership is active
//! until it is ended; an ended membership keeps its head flag as history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Actor, AuditStamp, FamilyId, InsureeId, MembershipId};

use crate::error::HouseholdError;

/// Membership lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Transferred,
    Deceased,
}

impl MembershipStatus {
    pub fn code(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "AC",
            MembershipStatus::Inactive => "IN",
            MembershipStatus::Transferred => "TR",
            MembershipStatus::Deceased => "DE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "AC" => Some(MembershipStatus::Active),
            "IN" => Some(MembershipStatus::Inactive),
            "TR" => Some(MembershipStatus::Transferred),
            "DE" => Some(MembershipStatus::Deceased),
            _ => None,
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Link between an insuree and a family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMembership {
    pub id: MembershipId,
    pub family_id: FamilyId,
    pub insuree_id: InsureeId,
    /// Relationship to the head of family (reference code)
    pub relationship_code: Option<String>,
    pub is_head: bool,
    pub status: MembershipStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub audit: AuditStamp,
}

impl FamilyMembership {
    /// Starts a new active membership on `start_date`
    pub fn start(
        family_id: FamilyId,
        insuree_id: InsureeId,
        relationship_code: Option<String>,
        is_head: bool,
        start_date: NaiveDate,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipId::new(),
            family_id,
            insuree_id,
            relationship_code,
            is_head,
            status: MembershipStatus::Active,
            start_date,
            end_date: None,
            notes: None,
            audit: AuditStamp::new(actor, at),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    pub fn ensure_active(&self) -> Result<(), HouseholdError> {
        if !self.is_active() {
            return Err(HouseholdError::MembershipNotActive(self.id.to_string()));
        }
        Ok(())
    }

    /// Ends the membership with a terminal status
    ///
    /// # Errors
    ///
    /// Returns `MembershipNotActive` if the membership has already ended.
    pub fn end(
        &mut self,
        status: MembershipStatus,
        reason: Option<&str>,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), HouseholdError> {
        self.close(status, reason, at.date_naive(), actor, at)
    }

    fn close(
        &mut self,
        status: MembershipStatus,
        reason: Option<&str>,
        end_date: NaiveDate,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), HouseholdError> {
        self.ensure_active()?;
        debug_assert!(status != MembershipStatus::Active);

        let end_date = end_date.max(self.start_date);
        self.status = status;
        self.end_date = Some(end_date);
        if let Some(reason) = reason {
            let note = format!("{}: {}", status, reason);
            self.notes = Some(match self.notes.take() {
                Some(existing) => format!("{}\n{}", existing, note),
                None => note,
            });
        }
        self.audit.touch(actor, at);
        Ok(())
    }

    /// Ends this membership as transferred and returns the destination record
    ///
    /// The source ends and the destination starts on `transfer_date`. The new
    /// membership keeps the relationship code and is never head.
    ///
    /// # Errors
    ///
    /// * `SameFamily` - the destination is the current family
    /// * `Validation` - `transfer_date` precedes the current start date
    /// * `MembershipNotActive` - the membership has already ended
    pub fn transfer_to(
        &mut self,
        family_id: FamilyId,
        transfer_date: NaiveDate,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<FamilyMembership, HouseholdError> {
        if self.family_id == family_id {
            return Err(HouseholdError::SameFamily(family_id.to_string()));
        }
        if transfer_date < self.start_date {
            return Err(HouseholdError::field(
                "transferDate",
                format!("cannot precede the membership start date {}", self.start_date),
            ));
        }
        self.close(MembershipStatus::Transferred, None, transfer_date, actor, at)?;
        Ok(FamilyMembership::start(
            family_id,
            self.insuree_id,
            self.relationship_code.clone(),
            false,
            transfer_date,
            actor,
            at,
        ))
    }

    pub fn set_head(&mut self, is_head: bool, actor: &Actor, at: DateTime<Utc>) {
        if self.is_head != is_head {
            self.is_head = is_head;
            self.audit.touch(actor, at);
        }
    }
}
