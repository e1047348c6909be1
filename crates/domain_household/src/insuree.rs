//! Insuree entity
//!
//! An insuree is an individual covered by the system, identified externally
//! by a unique `chfId`. Insurees are never hard-deleted; deletion moves them
//! to INACTIVE and ends their active membership.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use core_kernel::validation::field_errors;
use core_kernel::{Actor, AuditStamp, FieldError, InsureeId};
use domain_reference::{ReferenceData, ReferenceKind};

use crate::error::HouseholdError;

/// Maximum length of the external identifier
pub const CHF_ID_MAX_LEN: usize = 12;

/// Insuree lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsureeStatus {
    Active,
    Inactive,
    /// Terminal
    Deceased,
    Suspended,
    /// Registered but not yet confirmed
    Pending,
}

impl InsureeStatus {
    /// Two-letter storage code
    pub fn code(&self) -> &'static str {
        match self {
            InsureeStatus::Active => "AC",
            InsureeStatus::Inactive => "IN",
            InsureeStatus::Deceased => "DE",
            InsureeStatus::Suspended => "SU",
            InsureeStatus::Pending => "PE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "AC" => Some(InsureeStatus::Active),
            "IN" => Some(InsureeStatus::Inactive),
            "DE" => Some(InsureeStatus::Deceased),
            "SU" => Some(InsureeStatus::Suspended),
            "PE" => Some(InsureeStatus::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for InsureeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Marital status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub fn code(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "S",
            MaritalStatus::Married => "M",
            MaritalStatus::Divorced => "D",
            MaritalStatus::Widowed => "W",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(MaritalStatus::Single),
            "M" => Some(MaritalStatus::Married),
            "D" => Some(MaritalStatus::Divorced),
            "W" => Some(MaritalStatus::Widowed),
            _ => None,
        }
    }
}

/// Fields supplied when registering an insuree
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InsureeDetails {
    #[validate(length(min = 1, max = 12))]
    pub chf_id: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 100))]
    pub other_names: String,
    #[validate(length(min = 1, max = 1))]
    pub gender_code: String,
    pub dob: NaiveDate,
    #[serde(default)]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub current_address: Option<String>,
    #[serde(default)]
    pub profession_code: Option<String>,
    #[serde(default)]
    pub location_code: Option<String>,
}

impl InsureeDetails {
    /// Checks shape, date of birth and reference codes
    ///
    /// All problems are reported together, one entry per field.
    pub fn validate_with(
        &self,
        reference: &dyn ReferenceData,
        today: NaiveDate,
    ) -> Result<(), HouseholdError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        errors.extend(check_chf_id(&self.chf_id));
        errors.extend(check_dob(self.dob, today));
        errors.extend(check_codes(
            reference,
            Some(&self.gender_code),
            self.profession_code.as_deref(),
            self.location_code.as_deref(),
        ));
        finish(errors)
    }
}

/// Partial update of an insuree; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct InsureeChanges {
    #[validate(length(min = 1, max = 12))]
    pub chf_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub other_names: Option<String>,
    #[validate(length(min = 1, max = 1))]
    pub gender_code: Option<String>,
    pub dob: Option<NaiveDate>,
    pub marital_status: Option<MaritalStatus>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 200))]
    pub current_address: Option<String>,
    pub profession_code: Option<String>,
    pub location_code: Option<String>,
}

impl InsureeChanges {
    pub fn validate_with(
        &self,
        reference: &dyn ReferenceData,
        today: NaiveDate,
    ) -> Result<(), HouseholdError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        if let Some(chf_id) = &self.chf_id {
            errors.extend(check_chf_id(chf_id));
        }
        if let Some(dob) = self.dob {
            errors.extend(check_dob(dob, today));
        }
        errors.extend(check_codes(
            reference,
            self.gender_code.as_deref(),
            self.profession_code.as_deref(),
            self.location_code.as_deref(),
        ));
        finish(errors)
    }

    pub fn is_empty(&self) -> bool {
        self.chf_id.is_none()
            && self.last_name.is_none()
            && self.other_names.is_none()
            && self.gender_code.is_none()
            && self.dob.is_none()
            && self.marital_status.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.current_address.is_none()
            && self.profession_code.is_none()
            && self.location_code.is_none()
    }
}

fn check_chf_id(chf_id: &str) -> Option<FieldError> {
    if !chf_id.is_empty() && !chf_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(FieldError::validation("chfId", "must contain only letters and digits"));
    }
    None
}

fn check_dob(dob: NaiveDate, today: NaiveDate) -> Option<FieldError> {
    (dob > today).then(|| FieldError::validation("dob", "Date of birth cannot be in the future"))
}

fn check_codes(
    reference: &dyn ReferenceData,
    gender: Option<&str>,
    profession: Option<&str>,
    location: Option<&str>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(code) = gender {
        if !reference.is_known(ReferenceKind::Gender, code) {
            errors.push(FieldError::validation("genderCode", format!("unknown gender '{}'", code)));
        }
    }
    if let Some(code) = profession {
        if !reference.is_known(ReferenceKind::Profession, code) {
            errors.push(FieldError::validation(
                "professionCode",
                format!("unknown profession '{}'", code),
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

fn finish(mut errors: Vec<FieldError>) -> Result<(), HouseholdError> {
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(HouseholdError::Validation(errors))
}

/// An individual covered by the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insuree {
    pub id: InsureeId,
    pub chf_id: String,
    pub last_name: String,
    pub other_names: String,
    pub gender_code: String,
    pub dob: NaiveDate,
    pub marital_status: Option<MaritalStatus>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub current_address: Option<String>,
    pub profession_code: Option<String>,
    pub location_code: Option<String>,
    pub status: InsureeStatus,
    /// Date the status last changed
    pub status_date: NaiveDate,
    pub audit: AuditStamp,
}

impl Insuree {
    /// Registers a new, active insuree
    pub fn register(details: InsureeDetails, actor: &Actor, at: DateTime<Utc>) -> Self {
        Self {
            id: InsureeId::new(),
            chf_id: details.chf_id,
            last_name: details.last_name,
            other_names: details.other_names,
            gender_code: details.gender_code,
            dob: details.dob,
            marital_status: details.marital_status,
            phone: details.phone,
            email: details.email,
            current_address: details.current_address,
            profession_code: details.profession_code,
            location_code: details.location_code,
            status: InsureeStatus::Active,
            status_date: at.date_naive(),
            audit: AuditStamp::new(actor, at),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.other_names, self.last_name)
    }

    /// Age in whole years on the given date
    pub fn age_on(&self, on: NaiveDate) -> u32 {
        let mut age = on.year() - self.dob.year();
        if (on.month(), on.day()) < (self.dob.month(), self.dob.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }

    pub fn is_adult_on(&self, on: NaiveDate, age_of_majority: u32) -> bool {
        self.age_on(on) >= age_of_majority
    }

    pub fn is_active(&self) -> bool {
        self.status == InsureeStatus::Active
    }

    pub fn ensure_active(&self) -> Result<(), HouseholdError> {
        if !self.is_active() {
            return Err(HouseholdError::InsureeNotActive(self.chf_id.clone()));
        }
        Ok(())
    }

    /// Applies a partial update
    pub fn apply(&mut self, changes: InsureeChanges, actor: &Actor, at: DateTime<Utc>) {
        let InsureeChanges {
            chf_id,
            last_name,
            other_names,
            gender_code,
            dob,
            marital_status,
            phone,
            email,
            current_address,
            profession_code,
            location_code,
        } = changes;

        if let Some(v) = chf_id {
            self.chf_id = v;
        }
        if let Some(v) = last_name {
            self.last_name = v;
        }
        if let Some(v) = other_names {
            self.other_names = v;
        }
        if let Some(v) = gender_code {
            self.gender_code = v;
        }
        if let Some(v) = dob {
            self.dob = v;
        }
        if marital_status.is_some() {
            self.marital_status = marital_status;
        }
        if phone.is_some() {
            self.phone = phone;
        }
        if email.is_some() {
            self.email = email;
        }
        if current_address.is_some() {
            self.current_address = current_address;
        }
        if profession_code.is_some() {
            self.profession_code = profession_code;
        }
        if location_code.is_some() {
            self.location_code = location_code;
        }
        self.audit.touch(actor, at);
    }

    /// Checks if a status change is allowed
    pub fn can_transition_to(&self, target: InsureeStatus) -> bool {
        self.status != InsureeStatus::Deceased && self.status != target
    }

    /// Moves the insuree to a new lifecycle status
    pub fn change_status(
        &mut self,
        target: InsureeStatus,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), HouseholdError> {
        if !self.can_transition_to(target) {
            return Err(HouseholdError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        self.status_date = at.date_naive();
        self.audit.touch(actor, at);
        Ok(())
    }
}
