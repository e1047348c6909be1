//! Store Ports
//!
//! The service layer talks to persistence only through these traits. A
//! [`Store`] hands out [`UnitOfWork`]s; each unit of work is one transaction
//! that is either committed or rolled back as a whole. Dropping a unit of
//! work without committing rolls it back.
//!
//! # Locking
//!
//! `lock_*` methods read a row and hold a write lock on it until the unit of
//! work ends. Services lock families before insurees, and families in
//! identifier order, so concurrent units of work cannot deadlock on each
//! other.
//!
//! # Backstops
//!
//! Adapters enforce uniqueness (chfId, confirmation number, claim code) with
//! `PortError::Duplicate` and the membership invariants (one active
//! membership per insuree, one active head per family) with
//! `PortError::Conflict`, even though services check them first.

use async_trait::async_trait;

use core_kernel::{
    ClaimId, DomainPort, FamilyId, HealthCheckable, InsureeId, MembershipId, PolicyId, PortError,
};
use domain_claims::{Claim, ClaimStatusChange};
use domain_household::{Family, FamilyMembership, Insuree};
use domain_policy::Policy;

use crate::audit::AuditEntry;

/// Entry point to persistence
#[async_trait]
pub trait Store: DomainPort + HealthCheckable {
    /// Opens a new unit of work
    ///
    /// # Errors
    ///
    /// Returns `PortError::Timeout` if the store could not start a unit of
    /// work within the configured lock timeout, or `PortError::Connection`
    /// if the backing system is unavailable.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError>;
}

/// One transaction spanning a service operation
#[async_trait]
pub trait UnitOfWork: Send {
    // ========================================================================
    // Families
    // ========================================================================

    async fn family(&mut self, id: FamilyId) -> Result<Option<Family>, PortError>;

    async fn lock_family(&mut self, id: FamilyId) -> Result<Option<Family>, PortError>;

    async fn family_by_confirmation_no(
        &mut self,
        confirmation_no: &str,
    ) -> Result<Option<Family>, PortError>;

    /// Inserts or updates a family
    async fn save_family(&mut self, family: &Family) -> Result<(), PortError>;

    // ========================================================================
    // Insurees
    // ========================================================================

    async fn insuree(&mut self, id: InsureeId) -> Result<Option<Insuree>, PortError>;

    async fn lock_insuree(&mut self, id: InsureeId) -> Result<Option<Insuree>, PortError>;

    async fn insuree_by_chf_id(&mut self, chf_id: &str) -> Result<Option<Insuree>, PortError>;

    /// Loads several insurees; missing ids are skipped
    async fn insurees(&mut self, ids: &[InsureeId]) -> Result<Vec<Insuree>, PortError>;

    async fn save_insuree(&mut self, insuree: &Insuree) -> Result<(), PortError>;

    // ========================================================================
    // Memberships
    // ========================================================================

    async fn membership(&mut self, id: MembershipId) -> Result<Option<FamilyMembership>, PortError>;

    async fn active_memberships_of_family(
        &mut self,
        family_id: FamilyId,
    ) -> Result<Vec<FamilyMembership>, PortError>;

    async fn active_membership_of_insuree(
        &mut self,
        insuree_id: InsureeId,
    ) -> Result<Option<FamilyMembership>, PortError>;

    /// Every membership of an insuree, oldest first
    async fn memberships_of_insuree(
        &mut self,
        insuree_id: InsureeId,
    ) -> Result<Vec<FamilyMembership>, PortError>;

    async fn save_membership(&mut self, membership: &FamilyMembership) -> Result<(), PortError>;

    // ========================================================================
    // Policies
    // ========================================================================

    async fn policy(&mut self, id: PolicyId) -> Result<Option<Policy>, PortError>;

    async fn lock_policy(&mut self, id: PolicyId) -> Result<Option<Policy>, PortError>;

    async fn policies_of_family(&mut self, family_id: FamilyId) -> Result<Vec<Policy>, PortError>;

    async fn save_policy(&mut self, policy: &Policy) -> Result<(), PortError>;

    // ========================================================================
    // Claims
    // ========================================================================

    async fn claim(&mut self, id: ClaimId) -> Result<Option<Claim>, PortError>;

    async fn lock_claim(&mut self, id: ClaimId) -> Result<Option<Claim>, PortError>;

    async fn claims_of_insuree(&mut self, insuree_id: InsureeId) -> Result<Vec<Claim>, PortError>;

    async fn save_claim(&mut self, claim: &Claim) -> Result<(), PortError>;

    async fn append_claim_history(&mut self, change: &ClaimStatusChange) -> Result<(), PortError>;

    /// Status changes of a claim in the order they were committed
    async fn claim_history(&mut self, claim_id: ClaimId) -> Result<Vec<ClaimStatusChange>, PortError>;

    // ========================================================================
    // Audit
    // ========================================================================

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), PortError>;

    // ========================================================================
    // Completion
    // ========================================================================

    async fn commit(self: Box<Self>) -> Result<(), PortError>;

    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}
