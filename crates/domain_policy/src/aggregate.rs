//! Policy Aggregate Root
//!
//! A policy is a coverage agreement scoped to a family. Its status is not
//! stored; it is derived from the coverage window on the date it is read,
//! unless an explicit suspension override is in place.
//!
//! # Invariants
//!
//! - `enroll_date <= start_date <= effective_date < expiry_date`
//! - Covered value is never negative
//! - Renewal extends the same record; the id never changes

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Actor, AuditStamp, FamilyId, FieldError, PolicyId};

use crate::error::PolicyError;

/// Maximum length of a product code
pub const PRODUCT_CODE_MAX_LEN: usize = 8;

/// Policy status as seen on a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    /// Coverage has not started yet
    Inactive,
    /// Within the coverage window
    Active,
    /// Explicitly suspended; overrides the window
    Suspended,
    /// Coverage window has passed
    Expired,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyStatus::Inactive => "INACTIVE",
            PolicyStatus::Active => "ACTIVE",
            PolicyStatus::Suspended => "SUSPENDED",
            PolicyStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// The four dates that define a coverage window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDates {
    pub enroll_date: NaiveDate,
    pub start_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

impl PolicyDates {
    /// Returns one error per violated ordering constraint
    pub fn check(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.start_date < self.enroll_date {
            errors.push(FieldError::validation(
                "startDate",
                "startDate must not be before enrollDate",
            ));
        }
        if self.effective_date < self.start_date {
            errors.push(FieldError::validation(
                "effectiveDate",
                "effectiveDate must not be before startDate",
            ));
        }
        if self.effective_date >= self.expiry_date {
            errors.push(FieldError::validation(
                "expiryDate",
                "expiryDate must be after effectiveDate",
            ));
        }
        errors
    }

    pub fn is_ordered(&self) -> bool {
        self.check().is_empty()
    }
}

/// A coverage agreement for a family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub family_id: FamilyId,
    pub product_code: String,
    pub enroll_date: NaiveDate,
    pub start_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    /// Covered value
    pub value: Decimal,
    pub suspended: bool,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub renewal_count: u32,
    pub audit: AuditStamp,
}

/// A policy together with its status on the date it was read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyView {
    #[serde(flatten)]
    pub policy: Policy,
    pub status: PolicyStatus,
}

impl Policy {
    pub fn dates(&self) -> PolicyDates {
        PolicyDates {
            enroll_date: self.enroll_date,
            start_date: self.start_date,
            effective_date: self.effective_date,
            expiry_date: self.expiry_date,
        }
    }

    /// Derives the status on the given date
    ///
    /// The expiry date itself is still covered.
    pub fn status_on(&self, today: NaiveDate) -> PolicyStatus {
        if self.suspended {
            PolicyStatus::Suspended
        } else if today < self.effective_date {
            PolicyStatus::Inactive
        } else if today <= self.expiry_date {
            PolicyStatus::Active
        } else {
            PolicyStatus::Expired
        }
    }

    pub fn view(&self, today: NaiveDate) -> PolicyView {
        PolicyView {
            policy: self.clone(),
            status: self.status_on(today),
        }
    }

    /// Extends the coverage window of this policy
    ///
    /// # Arguments
    ///
    /// * `effective_date` - Start of the renewed window
    /// * `expiry_date` - End of the renewed window, later than the current expiry
    /// * `today` - Date used to derive the current status
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` unless the policy is ACTIVE or EXPIRED, and
    /// `Validation` if the new window breaks the date ordering or does not
    /// extend coverage.
    pub fn renew(
        &mut self,
        effective_date: NaiveDate,
        expiry_date: NaiveDate,
        today: NaiveDate,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), PolicyError> {
        let status = self.status_on(today);
        if !matches!(status, PolicyStatus::Active | PolicyStatus::Expired) {
            return Err(PolicyError::InvalidStatus {
                operation: "renew".to_string(),
                status,
            });
        }

        let renewed = PolicyDates {
            effective_date,
            expiry_date,
            ..self.dates()
        };
        let mut errors = renewed.check();
        if expiry_date <= self.expiry_date {
            errors.push(FieldError::validation(
                "expiryDate",
                format!("expiryDate must be after the current expiry {}", self.expiry_date),
            ));
        }
        if !errors.is_empty() {
            return Err(PolicyError::Validation(errors));
        }

        self.effective_date = effective_date;
        self.expiry_date = expiry_date;
        self.renewal_count += 1;
        self.audit.touch(actor, at);
        Ok(())
    }

    /// Places an explicit suspension on the policy
    pub fn suspend(
        &mut self,
        reason: impl Into<String>,
        today: NaiveDate,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), PolicyError> {
        let status = self.status_on(today);
        if matches!(status, PolicyStatus::Suspended | PolicyStatus::Expired) {
            return Err(PolicyError::InvalidStatus {
                operation: "suspend".to_string(),
                status,
            });
        }
        self.suspended = true;
        self.suspension_reason = Some(reason.into());
        self.suspended_at = Some(at);
        self.audit.touch(actor, at);
        Ok(())
    }

    /// Lifts a suspension; the status falls back to the coverage window
    pub fn reinstate(&mut self, actor: &Actor, at: DateTime<Utc>) -> Result<(), PolicyError> {
        if !self.suspended {
            return Err(PolicyError::NotSuspended(self.id.to_string()));
        }
        self.suspended = false;
        self.suspension_reason = None;
        self.suspended_at = None;
        self.audit.touch(actor, at);
        Ok(())
    }

    /// True if the policy blocks deactivation of its family
    pub fn is_live_on(&self, today: NaiveDate) -> bool {
        matches!(
            self.status_on(today),
            PolicyStatus::Active | PolicyStatus::Suspended
        )
    }
}

/// Builder for new policies
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    family_id: Option<FamilyId>,
    product_code: Option<String>,
    dates: Option<PolicyDates>,
    value: Option<Decimal>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(mut self, family_id: FamilyId) -> Self {
        self.family_id = Some(family_id);
        self
    }

    pub fn product_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }

    pub fn dates(mut self, dates: PolicyDates) -> Self {
        self.dates = Some(dates);
        self
    }

    pub fn value(mut self, value: Decimal) -> Self {
        self.value = Some(value);
        self
    }

    /// Validates the collected fields and builds the policy
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` for an unset field, or `Validation`
    /// with every violated constraint.
    pub fn build(self, actor: &Actor, at: DateTime<Utc>) -> Result<Policy, PolicyError> {
        let family_id = self
            .family_id
            .ok_or_else(|| PolicyError::MissingRequiredField("familyId".to_string()))?;
        let product_code = self
            .product_code
            .ok_or_else(|| PolicyError::MissingRequiredField("productCode".to_string()))?;
        let dates = self
            .dates
            .ok_or_else(|| PolicyError::MissingRequiredField("dates".to_string()))?;
        let value = self
            .value
            .ok_or_else(|| PolicyError::MissingRequiredField("value".to_string()))?;

        let mut errors = Vec::new();
        let trimmed = product_code.trim();
        if trimmed.is_empty() || trimmed.len() > PRODUCT_CODE_MAX_LEN {
            errors.push(FieldError::validation(
                "productCode",
                format!("productCode must be 1 to {} characters", PRODUCT_CODE_MAX_LEN),
            ));
        }
        errors.extend(dates.check());
        if value.is_sign_negative() {
            errors.push(FieldError::validation("value", "value must not be negative"));
        }
        if !errors.is_empty() {
            return Err(PolicyError::Validation(errors));
        }

        Ok(Policy {
            id: PolicyId::new(),
            family_id,
            product_code: trimmed.to_string(),
            enroll_date: dates.enroll_date,
            start_date: dates.start_date,
            effective_date: dates.effective_date,
            expiry_date: dates.expiry_date,
            value,
            suspended: false,
            suspension_reason: None,
            suspended_at: None,
            renewal_count: 0,
            audit: AuditStamp::new(actor, at),
        })
    }
}
