//! Claims service
//!
//! Submission and the claim status machine. Each processed transition is
//! appended to the claim's history in the same unit of work as the claim.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use core_kernel::{ClaimId, Clock, CoreError, InsureeId, OperationContext};
use domain_claims::{Claim, ClaimAmounts, ClaimStatus, ClaimStatusChange, NewClaim};
use domain_reference::ReferenceData;

use crate::audit::{AuditEntry, EntityKind};
use crate::config::ServiceConfig;
use crate::in_unit_of_work;
use crate::ports::{Store, UnitOfWork};

/// Input for `processClaim`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessClaim {
    pub claim_id: ClaimId,
    pub target_status: ClaimStatus,
    #[serde(flatten)]
    pub amounts: ClaimAmounts,
    /// Required when rejecting
    #[serde(default)]
    pub reason: Option<String>,
}

/// Claim operations over a [`Store`]
pub struct ClaimsService {
    store: Arc<dyn Store>,
    reference: Arc<dyn ReferenceData>,
    config: Arc<ServiceConfig>,
    clock: Arc<dyn Clock>,
}

impl ClaimsService {
    pub fn new(
        store: Arc<dyn Store>,
        reference: Arc<dyn ReferenceData>,
        config: Arc<ServiceConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            reference,
            config,
            clock,
        }
    }

    /// Submits a claim in status ENTERED
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - the visit is after the claim date, the claim
    ///   date is in the future, or the claimed amount is not positive
    /// * `NOT_FOUND` - the insuree or the health facility is unknown, or the
    ///   facility is inactive
    /// * `INVALID_STATE` - the insuree is not active
    pub async fn submit_claim(
        &self,
        ctx: &OperationContext,
        input: NewClaim,
    ) -> Result<Claim, CoreError> {
        ctx.ensure_authorized("submitClaim")?;
        input.check(self.clock.today())?;

        let facility_known = self
            .reference
            .health_facility(&input.facility_code)
            .is_some_and(|facility| facility.active);
        if !facility_known {
            return Err(CoreError::not_found("HealthFacility", &input.facility_code));
        }

        let claim = in_unit_of_work!(self, "submitClaim", |uow| {
            self.submit_claim_in(uow, ctx, &input)
        })?;

        info!(
            operation = "submitClaim",
            claim_id = %claim.id,
            claim_code = %claim.code,
            insuree_id = %claim.insuree_id,
            facility_code = %claim.facility_code,
            correlation_id = ?ctx.correlation_id,
            "Claim submitted"
        );
        Ok(claim)
    }

    async fn submit_claim_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &NewClaim,
    ) -> Result<Claim, CoreError> {
        let insuree = uow
            .lock_insuree(input.insuree_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Insuree", input.insuree_id))?;
        insuree.ensure_active()?;

        let now = self.clock.now();
        let claim = Claim::submit(
            input.clone(),
            &self.config.claim_code_prefix,
            &ctx.actor,
            now,
        );
        uow.save_claim(&claim).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "submitClaim",
            EntityKind::Claim,
            claim.id,
            format!("submitted as {}", claim.code),
            now,
        ))
        .await?;
        Ok(claim)
    }

    /// Applies one status transition
    ///
    /// # Errors
    ///
    /// * `NOT_FOUND` - the claim does not exist
    /// * `INVALID_STATE` - the transition is not allowed from the current status
    /// * `VALIDATION_ERROR` - inconsistent amounts or a missing rejection reason
    pub async fn process_claim(
        &self,
        ctx: &OperationContext,
        input: ProcessClaim,
    ) -> Result<Claim, CoreError> {
        ctx.ensure_authorized("processClaim")?;

        let claim = in_unit_of_work!(self, "processClaim", |uow| {
            self.process_claim_in(uow, ctx, &input)
        })
        .inspect_err(|error| {
            warn!(
                operation = "processClaim",
                claim_id = %input.claim_id,
                target_status = %input.target_status,
                error = %error,
                correlation_id = ?ctx.correlation_id,
                "Claim transition refused"
            );
        })?;

        info!(
            operation = "processClaim",
            claim_id = %claim.id,
            status = %claim.status,
            correlation_id = ?ctx.correlation_id,
            "Claim processed"
        );
        Ok(claim)
    }

    async fn process_claim_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &ProcessClaim,
    ) -> Result<Claim, CoreError> {
        let mut claim = uow
            .lock_claim(input.claim_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Claim", input.claim_id))?;

        let now = self.clock.now();
        let change = claim.transition(
            input.target_status,
            input.amounts.clone(),
            input.reason.clone(),
            &ctx.actor,
            now,
        )?;

        uow.save_claim(&claim).await?;
        uow.append_claim_history(&change).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "processClaim",
            EntityKind::Claim,
            claim.id,
            format!("{} -> {}", change.from_status, change.to_status),
            now,
        ))
        .await?;
        Ok(claim)
    }

    pub async fn get_claim(
        &self,
        ctx: &OperationContext,
        claim_id: ClaimId,
    ) -> Result<Claim, CoreError> {
        ctx.ensure_authorized("getClaim")?;
        in_unit_of_work!(self, "getClaim", |uow| existing_claim(uow, claim_id))
    }

    /// Committed status changes of a claim, oldest first
    pub async fn claim_history(
        &self,
        ctx: &OperationContext,
        claim_id: ClaimId,
    ) -> Result<Vec<ClaimStatusChange>, CoreError> {
        ctx.ensure_authorized("claimHistory")?;
        in_unit_of_work!(self, "claimHistory", |uow| history_of_claim(uow, claim_id))
    }

    /// Claims of an insuree, oldest claim date first
    pub async fn insuree_claims(
        &self,
        ctx: &OperationContext,
        insuree_id: InsureeId,
    ) -> Result<Vec<Claim>, CoreError> {
        ctx.ensure_authorized("insureeClaims")?;
        in_unit_of_work!(self, "insureeClaims", |uow| claims_of_insuree(uow, insuree_id))
    }
}

async fn existing_claim(uow: &mut dyn UnitOfWork, id: ClaimId) -> Result<Claim, CoreError> {
    uow.claim(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Claim", id))
}

async fn history_of_claim(
    uow: &mut dyn UnitOfWork,
    claim_id: ClaimId,
) -> Result<Vec<ClaimStatusChange>, CoreError> {
    existing_claim(uow, claim_id).await?;
    Ok(uow.claim_history(claim_id).await?)
}

async fn claims_of_insuree(
    uow: &mut dyn UnitOfWork,
    insuree_id: InsureeId,
) -> Result<Vec<Claim>, CoreError> {
    if uow.insuree(insuree_id).await?.is_none() {
        return Err(CoreError::not_found("Insuree", insuree_id));
    }
    Ok(uow.claims_of_insuree(insuree_id).await?)
}
