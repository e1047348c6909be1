//! In-memory store adapter
//!
//! Used by tests and local development. Units of work are serialized by an
//! async mutex: a unit of work owns the lock for its whole lifetime, works on
//! a copy of the state and publishes the copy on commit. Dropping or rolling
//! back a unit of work discards the copy.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, FamilyId, HealthCheckResult, HealthCheckable, InsureeId,
    MembershipId, PolicyId, PortError,
};
use domain_claims::{Claim, ClaimStatusChange};
use domain_household::{Family, FamilyMembership, Insuree};
use domain_policy::Policy;

use crate::audit::AuditEntry;
use crate::ports::{Store, UnitOfWork};

/// Everything the in-memory store holds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    pub families: HashMap<FamilyId, Family>,
    pub insurees: HashMap<InsureeId, Insuree>,
    pub memberships: HashMap<MembershipId, FamilyMembership>,
    pub policies: HashMap<PolicyId, Policy>,
    pub claims: HashMap<ClaimId, Claim>,
    pub claim_history: Vec<ClaimStatusChange>,
    pub audit_log: Vec<AuditEntry>,
}

/// In-memory implementation of [`Store`]
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    lock_timeout: Duration,
    injected_conflicts: Arc<AtomicU32>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            lock_timeout: Duration::from_millis(5_000),
            injected_conflicts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Makes the next `count` commits fail with a transaction conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DomainPort for InMemoryStore {}

#[async_trait]
impl HealthCheckable for InMemoryStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "in-memory-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError> {
        let guard = tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| PortError::Timeout {
                operation: "begin".to_string(),
                duration_ms: self.lock_timeout.as_millis() as u64,
            })?;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_commit: self.take_injected_conflict(),
        }))
    }
}

/// A unit of work over [`MemoryState`]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

fn sorted<T, K: Ord>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn family(&mut self, id: FamilyId) -> Result<Option<Family>, PortError> {
        Ok(self.working.families.get(&id).cloned())
    }

    async fn lock_family(&mut self, id: FamilyId) -> Result<Option<Family>, PortError> {
        self.family(id).await
    }

    async fn family_by_confirmation_no(
        &mut self,
        confirmation_no: &str,
    ) -> Result<Option<Family>, PortError> {
        Ok(self
            .working
            .families
            .values()
            .find(|f| f.confirmation_no.as_deref() == Some(confirmation_no))
            .cloned())
    }

    async fn save_family(&mut self, family: &Family) -> Result<(), PortError> {
        if let Some(no) = &family.confirmation_no {
            let taken = self
                .working
                .families
                .values()
                .any(|f| f.id != family.id && f.confirmation_no.as_ref() == Some(no));
            if taken {
                return Err(PortError::duplicate("confirmationNo", no));
            }
        }
        self.working.families.insert(family.id, family.clone());
        Ok(())
    }

    async fn insuree(&mut self, id: InsureeId) -> Result<Option<Insuree>, PortError> {
        Ok(self.working.insurees.get(&id).cloned())
    }

    async fn lock_insuree(&mut self, id: InsureeId) -> Result<Option<Insuree>, PortError> {
        self.insuree(id).await
    }

    async fn insuree_by_chf_id(&mut self, chf_id: &str) -> Result<Option<Insuree>, PortError> {
        Ok(self
            .working
            .insurees
            .values()
            .find(|i| i.chf_id == chf_id)
            .cloned())
    }

    async fn insurees(&mut self, ids: &[InsureeId]) -> Result<Vec<Insuree>, PortError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.insurees.get(id).cloned())
            .collect())
    }

    async fn save_insuree(&mut self, insuree: &Insuree) -> Result<(), PortError> {
        let taken = self
            .working
            .insurees
            .values()
            .any(|i| i.id != insuree.id && i.chf_id == insuree.chf_id);
        if taken {
            return Err(PortError::duplicate("chfId", &insuree.chf_id));
        }
        self.working.insurees.insert(insuree.id, insuree.clone());
        Ok(())
    }

    async fn membership(&mut self, id: MembershipId) -> Result<Option<FamilyMembership>, PortError> {
        Ok(self.working.memberships.get(&id).cloned())
    }

    async fn active_memberships_of_family(
        &mut self,
        family_id: FamilyId,
    ) -> Result<Vec<FamilyMembership>, PortError> {
        let active = self
            .working
            .memberships
            .values()
            .filter(|m| m.family_id == family_id && m.is_active())
            .cloned();
        Ok(sorted(active, |m| (m.start_date, m.id)))
    }

    async fn active_membership_of_insuree(
        &mut self,
        insuree_id: InsureeId,
    ) -> Result<Option<FamilyMembership>, PortError> {
        Ok(self
            .working
            .memberships
            .values()
            .find(|m| m.insuree_id == insuree_id && m.is_active())
            .cloned())
    }

    async fn memberships_of_insuree(
        &mut self,
        insuree_id: InsureeId,
    ) -> Result<Vec<FamilyMembership>, PortError> {
        let all = self
            .working
            .memberships
            .values()
            .filter(|m| m.insuree_id == insuree_id)
            .cloned();
        Ok(sorted(all, |m| (m.start_date, m.id)))
    }

    async fn save_membership(&mut self, membership: &FamilyMembership) -> Result<(), PortError> {
        if membership.is_active() {
            let others = self
                .working
                .memberships
                .values()
                .filter(|m| m.id != membership.id && m.is_active());
            for other in others {
                if other.insuree_id == membership.insuree_id {
                    return Err(PortError::conflict(format!(
                        "insuree {} already has an active membership",
                        membership.insuree_id
                    )));
                }
                if membership.is_head && other.is_head && other.family_id == membership.family_id {
                    return Err(PortError::conflict(format!(
                        "family {} already has an active head",
                        membership.family_id
                    )));
                }
            }
        }
        self.working.memberships.insert(membership.id, membership.clone());
        Ok(())
    }

    async fn policy(&mut self, id: PolicyId) -> Result<Option<Policy>, PortError> {
        Ok(self.working.policies.get(&id).cloned())
    }

    async fn lock_policy(&mut self, id: PolicyId) -> Result<Option<Policy>, PortError> {
        self.policy(id).await
    }

    async fn policies_of_family(&mut self, family_id: FamilyId) -> Result<Vec<Policy>, PortError> {
        let policies = self
            .working
            .policies
            .values()
            .filter(|p| p.family_id == family_id)
            .cloned();
        Ok(sorted(policies, |p| (p.enroll_date, p.id)))
    }

    async fn save_policy(&mut self, policy: &Policy) -> Result<(), PortError> {
        self.working.policies.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn claim(&mut self, id: ClaimId) -> Result<Option<Claim>, PortError> {
        Ok(self.working.claims.get(&id).cloned())
    }

    async fn lock_claim(&mut self, id: ClaimId) -> Result<Option<Claim>, PortError> {
        self.claim(id).await
    }

    async fn claims_of_insuree(&mut self, insuree_id: InsureeId) -> Result<Vec<Claim>, PortError> {
        let claims = self
            .working
            .claims
            .values()
            .filter(|c| c.insuree_id == insuree_id)
            .cloned();
        Ok(sorted(claims, |c| (c.claim_date, c.id)))
    }

    async fn save_claim(&mut self, claim: &Claim) -> Result<(), PortError> {
        let taken = self
            .working
            .claims
            .values()
            .any(|c| c.id != claim.id && c.code == claim.code);
        if taken {
            return Err(PortError::duplicate("code", &claim.code));
        }
        self.working.claims.insert(claim.id, claim.clone());
        Ok(())
    }

    async fn append_claim_history(&mut self, change: &ClaimStatusChange) -> Result<(), PortError> {
        self.working.claim_history.push(change.clone());
        Ok(())
    }

    async fn claim_history(&mut self, claim_id: ClaimId) -> Result<Vec<ClaimStatusChange>, PortError> {
        Ok(self
            .working
            .claim_history
            .iter()
            .filter(|c| c.claim_id == claim_id)
            .cloned()
            .collect())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), PortError> {
        self.working.audit_log.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let MemoryUnitOfWork {
            mut guard,
            working,
            fail_commit,
        } = *self;
        if fail_commit {
            return Err(PortError::TransactionConflict {
                message: "injected conflict".to_string(),
            });
        }
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        Ok(())
    }
}
