//! Coverage service
//!
//! Policies are returned as [`PolicyView`]s carrying the status derived on
//! the service clock's current date.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use core_kernel::{Clock, CoreError, FamilyId, OperationContext, PolicyId};
use domain_policy::{Policy, PolicyBuilder, PolicyDates, PolicyView};

use crate::audit::{AuditEntry, EntityKind};
use crate::config::ServiceConfig;
use crate::in_unit_of_work;
use crate::ports::{Store, UnitOfWork};

/// Input for `createPolicy`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPolicy {
    pub family_id: FamilyId,
    pub product_code: String,
    #[serde(flatten)]
    pub dates: PolicyDates,
    pub value: Decimal,
}

/// Input for `renewPolicy`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewPolicy {
    pub policy_id: PolicyId,
    pub new_effective_date: chrono::NaiveDate,
    pub new_expiry_date: chrono::NaiveDate,
}

/// Input for `suspendPolicy`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendPolicy {
    pub policy_id: PolicyId,
    pub reason: String,
}

/// Policy operations over a [`Store`]
pub struct CoverageService {
    store: Arc<dyn Store>,
    config: Arc<ServiceConfig>,
    clock: Arc<dyn Clock>,
}

impl CoverageService {
    pub fn new(store: Arc<dyn Store>, config: Arc<ServiceConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Creates a policy for an active family
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - the dates are out of order, the value is
    ///   negative or the product code is malformed
    /// * `NOT_FOUND` - the family does not exist
    /// * `INVALID_STATE` - the family is inactive
    pub async fn create_policy(
        &self,
        ctx: &OperationContext,
        input: NewPolicy,
    ) -> Result<PolicyView, CoreError> {
        ctx.ensure_authorized("createPolicy")?;
        let policy = PolicyBuilder::new()
            .family(input.family_id)
            .product_code(input.product_code)
            .dates(input.dates)
            .value(input.value)
            .build(&ctx.actor, self.clock.now())?;

        let policy = in_unit_of_work!(self, "createPolicy", |uow| {
            self.create_policy_in(uow, ctx, &policy)
        })?;

        info!(
            operation = "createPolicy",
            policy_id = %policy.id,
            family_id = %policy.family_id,
            product_code = %policy.product_code,
            correlation_id = ?ctx.correlation_id,
            "Policy created"
        );
        Ok(policy.view(self.clock.today()))
    }

    async fn create_policy_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        policy: &Policy,
    ) -> Result<Policy, CoreError> {
        let family = uow
            .lock_family(policy.family_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Family", policy.family_id))?;
        family.ensure_active()?;

        uow.save_policy(policy).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "createPolicy",
            EntityKind::Policy,
            policy.id,
            format!("created for family {}", family.id),
            self.clock.now(),
        ))
        .await?;
        Ok(policy.clone())
    }

    /// Extends an ACTIVE or EXPIRED policy with a new coverage window
    ///
    /// The policy keeps its id, enroll and start dates.
    pub async fn renew_policy(
        &self,
        ctx: &OperationContext,
        input: RenewPolicy,
    ) -> Result<PolicyView, CoreError> {
        ctx.ensure_authorized("renewPolicy")?;

        let policy = in_unit_of_work!(self, "renewPolicy", |uow| {
            self.renew_policy_in(uow, ctx, &input)
        })?;

        info!(
            operation = "renewPolicy",
            policy_id = %policy.id,
            expiry_date = %policy.expiry_date,
            renewal_count = policy.renewal_count,
            correlation_id = ?ctx.correlation_id,
            "Policy renewed"
        );
        Ok(policy.view(self.clock.today()))
    }

    async fn renew_policy_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &RenewPolicy,
    ) -> Result<Policy, CoreError> {
        let mut policy = locked_policy(uow, input.policy_id).await?;
        let now = self.clock.now();
        policy.renew(
            input.new_effective_date,
            input.new_expiry_date,
            now.date_naive(),
            &ctx.actor,
            now,
        )?;

        uow.save_policy(&policy).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "renewPolicy",
            EntityKind::Policy,
            policy.id,
            format!(
                "renewed {} to {}",
                policy.effective_date, policy.expiry_date
            ),
            now,
        ))
        .await?;
        Ok(policy)
    }

    /// Places an explicit suspension on a policy
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - the reason is blank
    /// * `NOT_FOUND` - the policy does not exist
    /// * `INVALID_STATE` - the policy is already suspended or expired
    pub async fn suspend_policy(
        &self,
        ctx: &OperationContext,
        input: SuspendPolicy,
    ) -> Result<PolicyView, CoreError> {
        ctx.ensure_authorized("suspendPolicy")?;
        if input.reason.trim().is_empty() {
            return Err(CoreError::validation_field("reason", "reason is required"));
        }

        let policy = in_unit_of_work!(self, "suspendPolicy", |uow| {
            self.suspend_policy_in(uow, ctx, &input)
        })?;

        info!(
            operation = "suspendPolicy",
            policy_id = %policy.id,
            correlation_id = ?ctx.correlation_id,
            "Policy suspended"
        );
        Ok(policy.view(self.clock.today()))
    }

    async fn suspend_policy_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &SuspendPolicy,
    ) -> Result<Policy, CoreError> {
        let mut policy = locked_policy(uow, input.policy_id).await?;
        let now = self.clock.now();
        policy.suspend(input.reason.trim(), now.date_naive(), &ctx.actor, now)?;

        uow.save_policy(&policy).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "suspendPolicy",
            EntityKind::Policy,
            policy.id,
            format!("suspended: {}", input.reason.trim()),
            now,
        ))
        .await?;
        Ok(policy)
    }

    /// Lifts a suspension
    pub async fn reinstate_policy(
        &self,
        ctx: &OperationContext,
        policy_id: PolicyId,
    ) -> Result<PolicyView, CoreError> {
        ctx.ensure_authorized("reinstatePolicy")?;

        let policy = in_unit_of_work!(self, "reinstatePolicy", |uow| {
            self.reinstate_policy_in(uow, ctx, policy_id)
        })?;

        info!(
            operation = "reinstatePolicy",
            policy_id = %policy.id,
            correlation_id = ?ctx.correlation_id,
            "Policy reinstated"
        );
        Ok(policy.view(self.clock.today()))
    }

    async fn reinstate_policy_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        policy_id: PolicyId,
    ) -> Result<Policy, CoreError> {
        let mut policy = locked_policy(uow, policy_id).await?;
        let now = self.clock.now();
        policy.reinstate(&ctx.actor, now)?;

        uow.save_policy(&policy).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "reinstatePolicy",
            EntityKind::Policy,
            policy.id,
            "reinstated",
            now,
        ))
        .await?;
        Ok(policy)
    }

    pub async fn get_policy(
        &self,
        ctx: &OperationContext,
        policy_id: PolicyId,
    ) -> Result<PolicyView, CoreError> {
        ctx.ensure_authorized("getPolicy")?;
        let policy = in_unit_of_work!(self, "getPolicy", |uow| existing_policy(uow, policy_id))?;
        Ok(policy.view(self.clock.today()))
    }

    /// Policies of a family, oldest enrollment first
    pub async fn family_policies(
        &self,
        ctx: &OperationContext,
        family_id: FamilyId,
    ) -> Result<Vec<PolicyView>, CoreError> {
        ctx.ensure_authorized("familyPolicies")?;
        let policies = in_unit_of_work!(self, "familyPolicies", |uow| {
            policies_of_family(uow, family_id)
        })?;
        let today = self.clock.today();
        Ok(policies.iter().map(|p| p.view(today)).collect())
    }
}

async fn locked_policy(uow: &mut dyn UnitOfWork, id: PolicyId) -> Result<Policy, CoreError> {
    uow.lock_policy(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Policy", id))
}

async fn existing_policy(uow: &mut dyn UnitOfWork, id: PolicyId) -> Result<Policy, CoreError> {
    uow.policy(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Policy", id))
}

async fn policies_of_family(
    uow: &mut dyn UnitOfWork,
    family_id: FamilyId,
) -> Result<Vec<Policy>, CoreError> {
    if uow.family(family_id).await?.is_none() {
        return Err(CoreError::not_found("Family", family_id));
    }
    Ok(uow.policies_of_family(family_id).await?)
}
