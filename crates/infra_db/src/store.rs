//! PostgreSQL Store Adapter
//!
//! Implements the service layer's [`Store`] port over a `PgPool`. Each unit
//! of work is one database transaction; `lock_*` reads use
//! `SELECT ... FOR UPDATE` and every transaction runs with a local
//! `lock_timeout`, so a blocked lock surfaces as a transient error that the
//! service layer retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PgStore};
//!
//! let config = DatabaseConfig::new(url);
//! let pool = create_pool(&config).await?;
//! let store: Arc<dyn Store> = Arc::new(PgStore::new(pool, config.lock_timeout));
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use app_services::{AuditEntry, Store, UnitOfWork};
use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, FamilyId, HealthCheckResult, HealthCheckable, InsureeId,
    MembershipId, PolicyId, PortError,
};
use domain_claims::{Claim, ClaimStatusChange};
use domain_household::{Family, FamilyMembership, Insuree};
use domain_policy::Policy;

use crate::error::DatabaseError;
use crate::rows::{
    convert_all, ClaimRow, ClaimStatusChangeRow, FamilyRow, InsureeRow, MembershipRow, PolicyRow,
};

const FAMILY_COLUMNS: &str = "family_id, head_insuree_id, address, ethnicity, confirmation_type, \
    confirmation_no, family_type_code, location_code, poverty, member_count, is_active, \
    created_by, created_at, updated_by, updated_at, version";

const INSUREE_COLUMNS: &str = "insuree_id, chf_id, last_name, other_names, gender_code, dob, \
    marital_status, phone, email, current_address, profession_code, location_code, status, \
    status_date, created_by, created_at, updated_by, updated_at, version";

const MEMBERSHIP_COLUMNS: &str = "membership_id, family_id, insuree_id, relationship_code, \
    is_head, status, start_date, end_date, notes, created_by, created_at, updated_by, \
    updated_at, version";

const POLICY_COLUMNS: &str = "policy_id, family_id, product_code, enroll_date, start_date, \
    effective_date, expiry_date, value, suspended, suspension_reason, suspended_at, \
    renewal_count, created_by, created_at, updated_by, updated_at, version";

const CLAIM_COLUMNS: &str = "claim_id, code, insuree_id, facility_code, claim_date, visit_date, \
    visit_type, diagnosis, explanation, status, claimed, approved, rejected, valuated, \
    reimbursed, rejection_reason, created_by, created_at, updated_by, updated_at, version";

fn db(error: sqlx::Error) -> PortError {
    DatabaseError::from(error).into()
}

fn to_i32(value: u32, column: &str) -> Result<i32, PortError> {
    i32::try_from(value)
        .map_err(|_| PortError::internal(format!("{} {} exceeds the column range", column, value)))
}

/// PostgreSQL-backed implementation of [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    /// Creates a store over an existing pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    /// * `lock_timeout` - Maximum wait for row locks within a unit of work
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PgStore {}

#[async_trait]
impl HealthCheckable for PgStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                HealthCheckResult {
                    adapter_id: "postgres-store".to_string(),
                    status: AdapterHealth::Unhealthy,
                    latency_ms,
                    message: Some(e.to_string()),
                    checked_at: Utc::now(),
                }
            }
        }
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        // SET does not take bind parameters
        let statement = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&statement).execute(&mut *tx).await.map_err(db)?;
        debug!("Unit of work started");
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// A unit of work over one PostgreSQL transaction
///
/// Dropping it without calling `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    async fn fetch_family(&mut self, id: FamilyId, lock: bool) -> Result<Option<Family>, PortError> {
        let sql = format!(
            "SELECT {} FROM families WHERE family_id = $1{}",
            FAMILY_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, FamilyRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(Family::try_from).transpose()?)
    }

    async fn fetch_insuree(&mut self, id: InsureeId, lock: bool) -> Result<Option<Insuree>, PortError> {
        let sql = format!(
            "SELECT {} FROM insurees WHERE insuree_id = $1{}",
            INSUREE_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, InsureeRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(Insuree::try_from).transpose()?)
    }

    async fn fetch_policy(&mut self, id: PolicyId, lock: bool) -> Result<Option<Policy>, PortError> {
        let sql = format!(
            "SELECT {} FROM policies WHERE policy_id = $1{}",
            POLICY_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, PolicyRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(Policy::try_from).transpose()?)
    }

    async fn fetch_claim(&mut self, id: ClaimId, lock: bool) -> Result<Option<Claim>, PortError> {
        let sql = format!(
            "SELECT {} FROM claims WHERE claim_id = $1{}",
            CLAIM_COLUMNS,
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(Claim::try_from).transpose()?)
    }

    async fn fetch_memberships(
        &mut self,
        filter: &str,
        id: Uuid,
    ) -> Result<Vec<FamilyMembership>, PortError> {
        let sql = format!(
            "SELECT {} FROM family_memberships WHERE {} ORDER BY start_date, membership_id",
            MEMBERSHIP_COLUMNS, filter
        );
        let rows = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(convert_all(rows)?)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    // ========================================================================
    // Families
    // ========================================================================

    async fn family(&mut self, id: FamilyId) -> Result<Option<Family>, PortError> {
        self.fetch_family(id, false).await
    }

    async fn lock_family(&mut self, id: FamilyId) -> Result<Option<Family>, PortError> {
        self.fetch_family(id, true).await
    }

    async fn family_by_confirmation_no(
        &mut self,
        confirmation_no: &str,
    ) -> Result<Option<Family>, PortError> {
        let sql = format!("SELECT {} FROM families WHERE confirmation_no = $1", FAMILY_COLUMNS);
        let row = sqlx::query_as::<_, FamilyRow>(&sql)
            .bind(confirmation_no)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(Family::try_from).transpose()?)
    }

    async fn save_family(&mut self, family: &Family) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO families (
                family_id, head_insuree_id, address, ethnicity, confirmation_type,
                confirmation_no, family_type_code, location_code, poverty, member_count,
                is_active, created_by, created_at, updated_by, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (family_id) DO UPDATE SET
                head_insuree_id = EXCLUDED.head_insuree_id,
                address = EXCLUDED.address,
                ethnicity = EXCLUDED.ethnicity,
                confirmation_type = EXCLUDED.confirmation_type,
                confirmation_no = EXCLUDED.confirmation_no,
                family_type_code = EXCLUDED.family_type_code,
                location_code = EXCLUDED.location_code,
                poverty = EXCLUDED.poverty,
                member_count = EXCLUDED.member_count,
                is_active = EXCLUDED.is_active,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at,
                version = EXCLUDED.version
            "#,
        )
        .bind(*family.id.as_uuid())
        .bind(family.head_insuree_id.map(Uuid::from))
        .bind(&family.address)
        .bind(&family.ethnicity)
        .bind(&family.confirmation_type)
        .bind(&family.confirmation_no)
        .bind(&family.family_type_code)
        .bind(&family.location_code)
        .bind(family.poverty)
        .bind(to_i32(family.member_count, "member_count")?)
        .bind(family.is_active)
        .bind(&family.audit.created_by)
        .bind(family.audit.created_at)
        .bind(&family.audit.updated_by)
        .bind(family.audit.updated_at)
        .bind(family.audit.version)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    // ========================================================================
    // Insurees
    // ========================================================================

    async fn insuree(&mut self, id: InsureeId) -> Result<Option<Insuree>, PortError> {
        self.fetch_insuree(id, false).await
    }

    async fn lock_insuree(&mut self, id: InsureeId) -> Result<Option<Insuree>, PortError> {
        self.fetch_insuree(id, true).await
    }

    async fn insuree_by_chf_id(&mut self, chf_id: &str) -> Result<Option<Insuree>, PortError> {
        let sql = format!("SELECT {} FROM insurees WHERE chf_id = $1", INSUREE_COLUMNS);
        let row = sqlx::query_as::<_, InsureeRow>(&sql)
            .bind(chf_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(Insuree::try_from).transpose()?)
    }

    async fn insurees(&mut self, ids: &[InsureeId]) -> Result<Vec<Insuree>, PortError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!(
            "SELECT {} FROM insurees WHERE insuree_id = ANY($1) ORDER BY insuree_id",
            INSUREE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InsureeRow>(&sql)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(convert_all(rows)?)
    }

    async fn save_insuree(&mut self, insuree: &Insuree) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO insurees (
                insuree_id, chf_id, last_name, other_names, gender_code, dob,
                marital_status, phone, email, current_address, profession_code,
                location_code, status, status_date, created_by, created_at,
                updated_by, updated_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            ON CONFLICT (insuree_id) DO UPDATE SET
                chf_id = EXCLUDED.chf_id,
                last_name = EXCLUDED.last_name,
                other_names = EXCLUDED.other_names,
                gender_code = EXCLUDED.gender_code,
                dob = EXCLUDED.dob,
                marital_status = EXCLUDED.marital_status,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                current_address = EXCLUDED.current_address,
                profession_code = EXCLUDED.profession_code,
                location_code = EXCLUDED.location_code,
                status = EXCLUDED.status,
                status_date = EXCLUDED.status_date,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at,
                version = EXCLUDED.version
            "#,
        )
        .bind(*insuree.id.as_uuid())
        .bind(&insuree.chf_id)
        .bind(&insuree.last_name)
        .bind(&insuree.other_names)
        .bind(&insuree.gender_code)
        .bind(insuree.dob)
        .bind(insuree.marital_status.map(|s| s.code()))
        .bind(&insuree.phone)
        .bind(&insuree.email)
        .bind(&insuree.current_address)
        .bind(&insuree.profession_code)
        .bind(&insuree.location_code)
        .bind(insuree.status.code())
        .bind(insuree.status_date)
        .bind(&insuree.audit.created_by)
        .bind(insuree.audit.created_at)
        .bind(&insuree.audit.updated_by)
        .bind(insuree.audit.updated_at)
        .bind(insuree.audit.version)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    // ========================================================================
    // Memberships
    // ========================================================================

    async fn membership(&mut self, id: MembershipId) -> Result<Option<FamilyMembership>, PortError> {
        let sql = format!(
            "SELECT {} FROM family_memberships WHERE membership_id = $1",
            MEMBERSHIP_COLUMNS
        );
        let row = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(row.map(FamilyMembership::try_from).transpose()?)
    }

    async fn active_memberships_of_family(
        &mut self,
        family_id: FamilyId,
    ) -> Result<Vec<FamilyMembership>, PortError> {
        self.fetch_memberships("family_id = $1 AND status = 'AC'", *family_id.as_uuid())
            .await
    }

    async fn active_membership_of_insuree(
        &mut self,
        insuree_id: InsureeId,
    ) -> Result<Option<FamilyMembership>, PortError> {
        let mut active = self
            .fetch_memberships("insuree_id = $1 AND status = 'AC'", *insuree_id.as_uuid())
            .await?;
        Ok(active.pop())
    }

    async fn memberships_of_insuree(
        &mut self,
        insuree_id: InsureeId,
    ) -> Result<Vec<FamilyMembership>, PortError> {
        self.fetch_memberships("insuree_id = $1", *insuree_id.as_uuid())
            .await
    }

    async fn save_membership(&mut self, membership: &FamilyMembership) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO family_memberships (
                membership_id, family_id, insuree_id, relationship_code, is_head, status,
                start_date, end_date, notes, created_by, created_at, updated_by,
                updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (membership_id) DO UPDATE SET
                relationship_code = EXCLUDED.relationship_code,
                is_head = EXCLUDED.is_head,
                status = EXCLUDED.status,
                end_date = EXCLUDED.end_date,
                notes = EXCLUDED.notes,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at,
                version = EXCLUDED.version
            "#,
        )
        .bind(*membership.id.as_uuid())
        .bind(*membership.family_id.as_uuid())
        .bind(*membership.insuree_id.as_uuid())
        .bind(&membership.relationship_code)
        .bind(membership.is_head)
        .bind(membership.status.code())
        .bind(membership.start_date)
        .bind(membership.end_date)
        .bind(&membership.notes)
        .bind(&membership.audit.created_by)
        .bind(membership.audit.created_at)
        .bind(&membership.audit.updated_by)
        .bind(membership.audit.updated_at)
        .bind(membership.audit.version)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    // ========================================================================
    // Policies
    // ========================================================================

    async fn policy(&mut self, id: PolicyId) -> Result<Option<Policy>, PortError> {
        self.fetch_policy(id, false).await
    }

    async fn lock_policy(&mut self, id: PolicyId) -> Result<Option<Policy>, PortError> {
        self.fetch_policy(id, true).await
    }

    async fn policies_of_family(&mut self, family_id: FamilyId) -> Result<Vec<Policy>, PortError> {
        let sql = format!(
            "SELECT {} FROM policies WHERE family_id = $1 ORDER BY enroll_date, policy_id",
            POLICY_COLUMNS
        );
        let rows = sqlx::query_as::<_, PolicyRow>(&sql)
            .bind(*family_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(convert_all(rows)?)
    }

    async fn save_policy(&mut self, policy: &Policy) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO policies (
                policy_id, family_id, product_code, enroll_date, start_date,
                effective_date, expiry_date, value, suspended, suspension_reason,
                suspended_at, renewal_count, created_by, created_at, updated_by,
                updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (policy_id) DO UPDATE SET
                effective_date = EXCLUDED.effective_date,
                expiry_date = EXCLUDED.expiry_date,
                value = EXCLUDED.value,
                suspended = EXCLUDED.suspended,
                suspension_reason = EXCLUDED.suspension_reason,
                suspended_at = EXCLUDED.suspended_at,
                renewal_count = EXCLUDED.renewal_count,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at,
                version = EXCLUDED.version
            "#,
        )
        .bind(*policy.id.as_uuid())
        .bind(*policy.family_id.as_uuid())
        .bind(&policy.product_code)
        .bind(policy.enroll_date)
        .bind(policy.start_date)
        .bind(policy.effective_date)
        .bind(policy.expiry_date)
        .bind(policy.value)
        .bind(policy.suspended)
        .bind(&policy.suspension_reason)
        .bind(policy.suspended_at)
        .bind(to_i32(policy.renewal_count, "renewal_count")?)
        .bind(&policy.audit.created_by)
        .bind(policy.audit.created_at)
        .bind(&policy.audit.updated_by)
        .bind(policy.audit.updated_at)
        .bind(policy.audit.version)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    // ========================================================================
    // Claims
    // ========================================================================

    async fn claim(&mut self, id: ClaimId) -> Result<Option<Claim>, PortError> {
        self.fetch_claim(id, false).await
    }

    async fn lock_claim(&mut self, id: ClaimId) -> Result<Option<Claim>, PortError> {
        self.fetch_claim(id, true).await
    }

    async fn claims_of_insuree(&mut self, insuree_id: InsureeId) -> Result<Vec<Claim>, PortError> {
        let sql = format!(
            "SELECT {} FROM claims WHERE insuree_id = $1 ORDER BY claim_date, claim_id",
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(*insuree_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db)?;
        Ok(convert_all(rows)?)
    }

    async fn save_claim(&mut self, claim: &Claim) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, code, insuree_id, facility_code, claim_date, visit_date,
                visit_type, diagnosis, explanation, status, claimed, approved, rejected,
                valuated, reimbursed, rejection_reason, created_by, created_at,
                updated_by, updated_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            ON CONFLICT (claim_id) DO UPDATE SET
                status = EXCLUDED.status,
                approved = EXCLUDED.approved,
                rejected = EXCLUDED.rejected,
                valuated = EXCLUDED.valuated,
                reimbursed = EXCLUDED.reimbursed,
                rejection_reason = EXCLUDED.rejection_reason,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at,
                version = EXCLUDED.version
            "#,
        )
        .bind(*claim.id.as_uuid())
        .bind(&claim.code)
        .bind(*claim.insuree_id.as_uuid())
        .bind(&claim.facility_code)
        .bind(claim.claim_date)
        .bind(claim.visit_date)
        .bind(claim.visit_type.code())
        .bind(&claim.diagnosis)
        .bind(&claim.explanation)
        .bind(claim.status.as_str())
        .bind(claim.claimed)
        .bind(claim.approved)
        .bind(claim.rejected)
        .bind(claim.valuated)
        .bind(claim.reimbursed)
        .bind(&claim.rejection_reason)
        .bind(&claim.audit.created_by)
        .bind(claim.audit.created_at)
        .bind(&claim.audit.updated_by)
        .bind(claim.audit.updated_at)
        .bind(claim.audit.version)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn append_claim_history(&mut self, change: &ClaimStatusChange) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_status_history (
                change_id, claim_id, from_status, to_status, changed_by, changed_at, reason
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*change.id.as_uuid())
        .bind(*change.claim_id.as_uuid())
        .bind(change.from_status.as_str())
        .bind(change.to_status.as_str())
        .bind(&change.changed_by)
        .bind(change.changed_at)
        .bind(&change.reason)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn claim_history(&mut self, claim_id: ClaimId) -> Result<Vec<ClaimStatusChange>, PortError> {
        let rows = sqlx::query_as::<_, ClaimStatusChangeRow>(
            r#"
            SELECT change_id, claim_id, from_status, to_status, changed_by, changed_at, reason
            FROM claim_status_history
            WHERE claim_id = $1
            ORDER BY seq
            "#,
        )
        .bind(*claim_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(convert_all(rows)?)
    }

    // ========================================================================
    // Audit
    // ========================================================================

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (
                entry_id, entity_kind, entity_id, action, actor, correlation_id, at, summary
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*entry.id.as_uuid())
        .bind(entry.entity_kind.as_str())
        .bind(&entry.entity_id)
        .bind(&entry.action)
        .bind(&entry.actor)
        .bind(&entry.correlation_id)
        .bind(entry.at)
        .bind(&entry.summary)
        .execute(&mut *self.tx)
        .await
        .map_err(db)?;
        Ok(())
    }

    // ========================================================================
    // Completion
    // ========================================================================

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(db)
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        self.tx.rollback().await.map_err(db)
    }
}
