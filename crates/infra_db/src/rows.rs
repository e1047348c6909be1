//! Row types
//!
//! One `FromRow` struct per table, converted into domain types with
//! `TryFrom`. Status columns hold storage codes; an unknown code is reported
//! as a corrupt row instead of being guessed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use core_kernel::AuditStamp;
use domain_claims::{Claim, ClaimStatus, ClaimStatusChange, VisitType};
use domain_household::{Family, FamilyMembership, Insuree, InsureeStatus, MaritalStatus, MembershipStatus};
use domain_policy::Policy;

use crate::error::DatabaseError;

fn stamp(
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: String,
    updated_at: DateTime<Utc>,
    version: i64,
) -> AuditStamp {
    AuditStamp {
        created_by,
        created_at,
        updated_by,
        updated_at,
        version,
    }
}

fn count(table: &str, column: &str, value: i32) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::corrupt(table, column, value))
}

// ============================================================================
// Households
// ============================================================================

#[derive(Debug, FromRow)]
pub struct FamilyRow {
    pub family_id: Uuid,
    pub head_insuree_id: Option<Uuid>,
    pub address: Option<String>,
    pub ethnicity: Option<String>,
    pub confirmation_type: Option<String>,
    pub confirmation_no: Option<String>,
    pub family_type_code: Option<String>,
    pub location_code: Option<String>,
    pub poverty: bool,
    pub member_count: i32,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<FamilyRow> for Family {
    type Error = DatabaseError;

    fn try_from(row: FamilyRow) -> Result<Self, Self::Error> {
        Ok(Family {
            id: row.family_id.into(),
            head_insuree_id: row.head_insuree_id.map(Into::into),
            address: row.address,
            ethnicity: row.ethnicity,
            confirmation_type: row.confirmation_type,
            confirmation_no: row.confirmation_no,
            family_type_code: row.family_type_code,
            location_code: row.location_code,
            poverty: row.poverty,
            member_count: count("families", "member_count", row.member_count)?,
            is_active: row.is_active,
            audit: stamp(row.created_by, row.created_at, row.updated_by, row.updated_at, row.version),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct InsureeRow {
    pub insuree_id: Uuid,
    pub chf_id: String,
    pub last_name: String,
    pub other_names: String,
    pub gender_code: String,
    pub dob: NaiveDate,
    pub marital_status: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub current_address: Option<String>,
    pub profession_code: Option<String>,
    pub location_code: Option<String>,
    pub status: String,
    pub status_date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<InsureeRow> for Insuree {
    type Error = DatabaseError;

    fn try_from(row: InsureeRow) -> Result<Self, Self::Error> {
        let status = InsureeStatus::from_code(row.status.trim())
            .ok_or_else(|| DatabaseError::corrupt("insurees", "status", &row.status))?;
        let marital_status = match row.marital_status.as_deref().map(str::trim) {
            Some(code) => Some(
                MaritalStatus::from_code(code)
                    .ok_or_else(|| DatabaseError::corrupt("insurees", "marital_status", code))?,
            ),
            None => None,
        };

        Ok(Insuree {
            id: row.insuree_id.into(),
            chf_id: row.chf_id,
            last_name: row.last_name,
            other_names: row.other_names,
            gender_code: row.gender_code.trim().to_string(),
            dob: row.dob,
            marital_status,
            phone: row.phone,
            email: row.email,
            current_address: row.current_address,
            profession_code: row.profession_code,
            location_code: row.location_code,
            status,
            status_date: row.status_date,
            audit: stamp(row.created_by, row.created_at, row.updated_by, row.updated_at, row.version),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct MembershipRow {
    pub membership_id: Uuid,
    pub family_id: Uuid,
    pub insuree_id: Uuid,
    pub relationship_code: Option<String>,
    pub is_head: bool,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<MembershipRow> for FamilyMembership {
    type Error = DatabaseError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let status = MembershipStatus::from_code(row.status.trim())
            .ok_or_else(|| DatabaseError::corrupt("family_memberships", "status", &row.status))?;
        Ok(FamilyMembership {
            id: row.membership_id.into(),
            family_id: row.family_id.into(),
            insuree_id: row.insuree_id.into(),
            relationship_code: row.relationship_code,
            is_head: row.is_head,
            status,
            start_date: row.start_date,
            end_date: row.end_date,
            notes: row.notes,
            audit: stamp(row.created_by, row.created_at, row.updated_by, row.updated_at, row.version),
        })
    }
}

// ============================================================================
// Coverage
// ============================================================================

#[derive(Debug, FromRow)]
pub struct PolicyRow {
    pub policy_id: Uuid,
    pub family_id: Uuid,
    pub product_code: String,
    pub enroll_date: NaiveDate,
    pub start_date: NaiveDate,
    pub effective_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub value: Decimal,
    pub suspended: bool,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub renewal_count: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<PolicyRow> for Policy {
    type Error = DatabaseError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        Ok(Policy {
            id: row.policy_id.into(),
            family_id: row.family_id.into(),
            product_code: row.product_code,
            enroll_date: row.enroll_date,
            start_date: row.start_date,
            effective_date: row.effective_date,
            expiry_date: row.expiry_date,
            value: row.value,
            suspended: row.suspended,
            suspension_reason: row.suspension_reason,
            suspended_at: row.suspended_at,
            renewal_count: count("policies", "renewal_count", row.renewal_count)?,
            audit: stamp(row.created_by, row.created_at, row.updated_by, row.updated_at, row.version),
        })
    }
}

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub code: String,
    pub insuree_id: Uuid,
    pub facility_code: String,
    pub claim_date: NaiveDate,
    pub visit_date: NaiveDate,
    pub visit_type: String,
    pub diagnosis: Option<String>,
    pub explanation: Option<String>,
    pub status: String,
    pub claimed: Decimal,
    pub approved: Option<Decimal>,
    pub rejected: Option<Decimal>,
    pub valuated: Option<Decimal>,
    pub reimbursed: Option<Decimal>,
    pub rejection_reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = DatabaseError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        let status = ClaimStatus::parse(&row.status)
            .ok_or_else(|| DatabaseError::corrupt("claims", "status", &row.status))?;
        let visit_type = VisitType::from_code(row.visit_type.trim())
            .ok_or_else(|| DatabaseError::corrupt("claims", "visit_type", &row.visit_type))?;
        Ok(Claim {
            id: row.claim_id.into(),
            code: row.code,
            insuree_id: row.insuree_id.into(),
            facility_code: row.facility_code,
            claim_date: row.claim_date,
            visit_date: row.visit_date,
            visit_type,
            diagnosis: row.diagnosis,
            explanation: row.explanation,
            status,
            claimed: row.claimed,
            approved: row.approved,
            rejected: row.rejected,
            valuated: row.valuated,
            reimbursed: row.reimbursed,
            rejection_reason: row.rejection_reason,
            audit: stamp(row.created_by, row.created_at, row.updated_by, row.updated_at, row.version),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ClaimStatusChangeRow {
    pub change_id: Uuid,
    pub claim_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

impl TryFrom<ClaimStatusChangeRow> for ClaimStatusChange {
    type Error = DatabaseError;

    fn try_from(row: ClaimStatusChangeRow) -> Result<Self, Self::Error> {
        let parse = |column: &str, value: &str| {
            ClaimStatus::parse(value)
                .ok_or_else(|| DatabaseError::corrupt("claim_status_history", column, value))
        };
        Ok(ClaimStatusChange {
            id: row.change_id.into(),
            claim_id: row.claim_id.into(),
            from_status: parse("from_status", &row.from_status)?,
            to_status: parse("to_status", &row.to_status)?,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
            reason: row.reason,
        })
    }
}

/// Converts a batch of rows, failing on the first corrupt one
pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DatabaseError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}
