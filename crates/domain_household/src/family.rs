//! Family aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::validation::field_errors;
use core_kernel::{Actor, AuditStamp, FamilyId, FieldError, InsureeId};
use domain_reference::{ReferenceData, ReferenceKind};

use crate::error::HouseholdError;

/// Fields supplied when creating a family
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyDetails {
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub ethnicity: Option<String>,
    #[validate(length(max = 10))]
    pub confirmation_type: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub confirmation_no: Option<String>,
    pub family_type_code: Option<String>,
    pub location_code: Option<String>,
    pub poverty: bool,
}

impl FamilyDetails {
    pub fn validate_with(&self, reference: &dyn ReferenceData) -> Result<(), HouseholdError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        errors.extend(check_codes(
            reference,
            self.family_type_code.as_deref(),
            self.location_code.as_deref(),
        ));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HouseholdError::Validation(errors))
        }
    }
}

/// Partial update of a family; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyChanges {
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub ethnicity: Option<String>,
    #[validate(length(max = 10))]
    pub confirmation_type: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub confirmation_no: Option<String>,
    pub family_type_code: Option<String>,
    pub location_code: Option<String>,
    pub poverty: Option<bool>,
}

impl FamilyChanges {
    pub fn validate_with(&self, reference: &dyn ReferenceData) -> Result<(), HouseholdError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        errors.extend(check_codes(
            reference,
            self.family_type_code.as_deref(),
            self.location_code.as_deref(),
        ));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HouseholdError::Validation(errors))
        }
    }
}

fn check_codes(
    reference: &dyn ReferenceData,
    family_type: Option<&str>,
    location: Option<&str>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(code) = family_type {
        if !reference.is_known(ReferenceKind::FamilyType, code) {
            errors.push(FieldError::validation(
                "familyTypeCode",
                format!("unknown family type '{}'", code),
            ));
        }
    }
    if let Some(code) = location {
        if reference.location(code).is_none() {
            errors.push(FieldError::validation(
                "locationCode",
                format!("unknown location '{}'", code),
            ));
        }
    }
    errors
}

/// A household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: FamilyId,
    /// Mirrors the insuree of the active head membership
    pub head_insuree_id: Option<InsureeId>,
    pub address: Option<String>,
    pub ethnicity: Option<String>,
    pub confirmation_type: Option<String>,
    pub confirmation_no: Option<String>,
    pub family_type_code: Option<String>,
    pub location_code: Option<String>,
    pub poverty: bool,
    /// Number of active memberships
    pub member_count: u32,
    pub is_active: bool,
    pub audit: AuditStamp,
}

impl Family {
    pub fn create(details: FamilyDetails, actor: &Actor, at: DateTime<Utc>) -> Self {
        Self {
            id: FamilyId::new(),
            head_insuree_id: None,
            address: details.address,
            ethnicity: details.ethnicity,
            confirmation_type: details.confirmation_type,
            confirmation_no: details.confirmation_no,
            family_type_code: details.family_type_code,
            location_code: details.location_code,
            poverty: details.poverty,
            member_count: 0,
            is_active: true,
            audit: AuditStamp::new(actor, at),
        }
    }

    pub fn ensure_active(&self) -> Result<(), HouseholdError> {
        if !self.is_active {
            return Err(HouseholdError::FamilyInactive(self.id.to_string()));
        }
        Ok(())
    }

    pub fn apply(&mut self, changes: FamilyChanges, actor: &Actor, at: DateTime<Utc>) {
        if changes.address.is_some() {
            self.address = changes.address;
        }
        if changes.ethnicity.is_some() {
            self.ethnicity = changes.ethnicity;
        }
        if changes.confirmation_type.is_some() {
            self.confirmation_type = changes.confirmation_type;
        }
        if changes.confirmation_no.is_some() {
            self.confirmation_no = changes.confirmation_no;
        }
        if changes.family_type_code.is_some() {
            self.family_type_code = changes.family_type_code;
        }
        if changes.location_code.is_some() {
            self.location_code = changes.location_code;
        }
        if let Some(poverty) = changes.poverty {
            self.poverty = poverty;
        }
        self.audit.touch(actor, at);
    }

    /// Records the outcome of a membership change
    pub fn record_membership(
        &mut self,
        head_insuree_id: Option<InsureeId>,
        member_count: u32,
        actor: &Actor,
        at: DateTime<Utc>,
    ) {
        self.head_insuree_id = head_insuree_id;
        self.member_count = member_count;
        self.audit.touch(actor, at);
    }

    /// Marks the family inactive; memberships are ended by the caller
    pub fn deactivate(&mut self, actor: &Actor, at: DateTime<Utc>) -> Result<(), HouseholdError> {
        self.ensure_active()?;
        self.is_active = false;
        self.head_insuree_id = None;
        self.member_count = 0;
        self.audit.touch(actor, at);
        Ok(())
    }
}
