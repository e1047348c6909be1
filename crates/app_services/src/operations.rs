//! Operation table
//!
//! Every service operation as one serde-tagged enum, dispatched by a single
//! `match`. The wire form is
//! `{"operation": "createFamily", "input": {...}}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use core_kernel::{
    ClaimId, Clock, CoreError, FamilyId, HealthCheckResult, InsureeId, OperationContext,
    OperationResult, PolicyId,
};
use domain_claims::{Claim, ClaimStatusChange, NewClaim};
use domain_household::{Family, FamilyDetails, FamilyMembership, Insuree};
use domain_policy::PolicyView;
use domain_reference::ReferenceData;

use crate::claims::{ClaimsService, ProcessClaim};
use crate::config::ServiceConfig;
use crate::coverage::{CoverageService, NewPolicy, RenewPolicy, SuspendPolicy};
use crate::household::{
    AddFamilyMember, ChangeInsureeStatus, CreateInsuree, HouseholdService, RemoveFamilyMember,
    SetHeadOfFamily, TransferFamilyMember, UpdateFamily, UpdateInsuree,
};
use crate::ports::Store;

/// Permission an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    HouseholdRead,
    HouseholdWrite,
    PolicyRead,
    PolicyWrite,
    ClaimRead,
    ClaimSubmit,
    ClaimProcess,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::HouseholdRead => "household:read",
            Permission::HouseholdWrite => "household:write",
            Permission::PolicyRead => "policy:read",
            Permission::PolicyWrite => "policy:write",
            Permission::ClaimRead => "claim:read",
            Permission::ClaimSubmit => "claim:submit",
            Permission::ClaimProcess => "claim:process",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRef {
    pub family_id: FamilyId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsureeRef {
    pub insuree_id: InsureeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRef {
    pub policy_id: PolicyId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRef {
    pub claim_id: ClaimId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChfIdRef {
    pub chf_id: String,
}

/// One request to the service layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", content = "input", rename_all = "camelCase")]
pub enum Operation {
    // Household
    CreateFamily(FamilyDetails),
    UpdateFamily(UpdateFamily),
    DeleteFamily(FamilyRef),
    GetFamily(FamilyRef),
    FamilyMembers(FamilyRef),
    CreateInsuree(CreateInsuree),
    UpdateInsuree(UpdateInsuree),
    ChangeInsureeStatus(ChangeInsureeStatus),
    DeleteInsuree(InsureeRef),
    GetInsuree(InsureeRef),
    FindInsureeByChfId(ChfIdRef),
    MembershipHistory(InsureeRef),
    AddFamilyMember(AddFamilyMember),
    TransferFamilyMember(TransferFamilyMember),
    RemoveFamilyMember(RemoveFamilyMember),
    SetHeadOfFamily(SetHeadOfFamily),

    // Coverage
    CreatePolicy(NewPolicy),
    RenewPolicy(RenewPolicy),
    SuspendPolicy(SuspendPolicy),
    ReinstatePolicy(PolicyRef),
    GetPolicy(PolicyRef),
    FamilyPolicies(FamilyRef),

    // Claims
    SubmitClaim(NewClaim),
    ProcessClaim(ProcessClaim),
    GetClaim(ClaimRef),
    ClaimHistory(ClaimRef),
    InsureeClaims(InsureeRef),
}

impl Operation {
    /// Wire name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateFamily(_) => "createFamily",
            Operation::UpdateFamily(_) => "updateFamily",
            Operation::DeleteFamily(_) => "deleteFamily",
            Operation::GetFamily(_) => "getFamily",
            Operation::FamilyMembers(_) => "familyMembers",
            Operation::CreateInsuree(_) => "createInsuree",
            Operation::UpdateInsuree(_) => "updateInsuree",
            Operation::ChangeInsureeStatus(_) => "changeInsureeStatus",
            Operation::DeleteInsuree(_) => "deleteInsuree",
            Operation::GetInsuree(_) => "getInsuree",
            Operation::FindInsureeByChfId(_) => "findInsureeByChfId",
            Operation::MembershipHistory(_) => "membershipHistory",
            Operation::AddFamilyMember(_) => "addFamilyMember",
            Operation::TransferFamilyMember(_) => "transferFamilyMember",
            Operation::RemoveFamilyMember(_) => "removeFamilyMember",
            Operation::SetHeadOfFamily(_) => "setHeadOfFamily",
            Operation::CreatePolicy(_) => "createPolicy",
            Operation::RenewPolicy(_) => "renewPolicy",
            Operation::SuspendPolicy(_) => "suspendPolicy",
            Operation::ReinstatePolicy(_) => "reinstatePolicy",
            Operation::GetPolicy(_) => "getPolicy",
            Operation::FamilyPolicies(_) => "familyPolicies",
            Operation::SubmitClaim(_) => "submitClaim",
            Operation::ProcessClaim(_) => "processClaim",
            Operation::GetClaim(_) => "getClaim",
            Operation::ClaimHistory(_) => "claimHistory",
            Operation::InsureeClaims(_) => "insureeClaims",
        }
    }

    pub fn required_permission(&self) -> Permission {
        match self {
            Operation::GetFamily(_)
            | Operation::FamilyMembers(_)
            | Operation::GetInsuree(_)
            | Operation::FindInsureeByChfId(_)
            | Operation::MembershipHistory(_) => Permission::HouseholdRead,

            Operation::CreateFamily(_)
            | Operation::UpdateFamily(_)
            | Operation::DeleteFamily(_)
            | Operation::CreateInsuree(_)
            | Operation::UpdateInsuree(_)
            | Operation::ChangeInsureeStatus(_)
            | Operation::DeleteInsuree(_)
            | Operation::AddFamilyMember(_)
            | Operation::TransferFamilyMember(_)
            | Operation::RemoveFamilyMember(_)
            | Operation::SetHeadOfFamily(_) => Permission::HouseholdWrite,

            Operation::GetPolicy(_) | Operation::FamilyPolicies(_) => Permission::PolicyRead,

            Operation::CreatePolicy(_)
            | Operation::RenewPolicy(_)
            | Operation::SuspendPolicy(_)
            | Operation::ReinstatePolicy(_) => Permission::PolicyWrite,

            Operation::GetClaim(_) | Operation::ClaimHistory(_) | Operation::InsureeClaims(_) => {
                Permission::ClaimRead
            }
            Operation::SubmitClaim(_) => Permission::ClaimSubmit,
            Operation::ProcessClaim(_) => Permission::ClaimProcess,
        }
    }
}

/// Data returned by an operation
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    Family(Family),
    Insuree(Insuree),
    Membership(FamilyMembership),
    Memberships(Vec<FamilyMembership>),
    Policy(PolicyView),
    Policies(Vec<PolicyView>),
    Claim(Claim),
    Claims(Vec<Claim>),
    ClaimHistory(Vec<ClaimStatusChange>),
}

/// The three services over one store
pub struct Services {
    pub household: HouseholdService,
    pub coverage: CoverageService,
    pub claims: ClaimsService,
    store: Arc<dyn Store>,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        reference: Arc<dyn ReferenceData>,
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            household: HouseholdService::new(
                store.clone(),
                reference.clone(),
                config.clone(),
                clock.clone(),
            ),
            coverage: CoverageService::new(store.clone(), config.clone(), clock.clone()),
            claims: ClaimsService::new(store.clone(), reference, config, clock),
            store,
        }
    }

    /// Health of the underlying store
    pub async fn health(&self) -> HealthCheckResult {
        self.store.health_check().await
    }

    /// Runs one operation and wraps the outcome in an [`OperationResult`]
    pub async fn execute(
        &self,
        ctx: &OperationContext,
        operation: Operation,
    ) -> OperationResult<OperationOutput> {
        let name = operation.name();
        let outcome = self.dispatch(ctx, operation).await;
        if let Err(error) = &outcome {
            warn!(
                operation = name,
                code = %error.code(),
                error = %error,
                correlation_id = ?ctx.correlation_id,
                "Operation failed"
            );
        }
        outcome.into()
    }

    async fn dispatch(
        &self,
        ctx: &OperationContext,
        operation: Operation,
    ) -> Result<OperationOutput, CoreError> {
        use OperationOutput as Out;

        let household = &self.household;
        let coverage = &self.coverage;
        let claims = &self.claims;

        Ok(match operation {
            Operation::CreateFamily(input) => Out::Family(household.create_family(ctx, input).await?),
            Operation::UpdateFamily(input) => Out::Family(household.update_family(ctx, input).await?),
            Operation::DeleteFamily(r) => Out::Family(household.delete_family(ctx, r.family_id).await?),
            Operation::GetFamily(r) => Out::Family(household.get_family(ctx, r.family_id).await?),
            Operation::FamilyMembers(r) => {
                Out::Memberships(household.family_members(ctx, r.family_id).await?)
            }
            Operation::CreateInsuree(input) => {
                Out::Insuree(household.create_insuree(ctx, input).await?)
            }
            Operation::UpdateInsuree(input) => {
                Out::Insuree(household.update_insuree(ctx, input).await?)
            }
            Operation::ChangeInsureeStatus(input) => {
                Out::Insuree(household.change_insuree_status(ctx, input).await?)
            }
            Operation::DeleteInsuree(r) => {
                Out::Insuree(household.delete_insuree(ctx, r.insuree_id).await?)
            }
            Operation::GetInsuree(r) => Out::Insuree(household.get_insuree(ctx, r.insuree_id).await?),
            Operation::FindInsureeByChfId(r) => {
                Out::Insuree(household.find_insuree_by_chf_id(ctx, &r.chf_id).await?)
            }
            Operation::MembershipHistory(r) => {
                Out::Memberships(household.membership_history(ctx, r.insuree_id).await?)
            }
            Operation::AddFamilyMember(input) => {
                Out::Membership(household.add_family_member(ctx, input).await?)
            }
            Operation::TransferFamilyMember(input) => {
                Out::Membership(household.transfer_family_member(ctx, input).await?)
            }
            Operation::RemoveFamilyMember(input) => {
                Out::Membership(household.remove_family_member(ctx, input).await?)
            }
            Operation::SetHeadOfFamily(input) => {
                Out::Membership(household.set_head_of_family(ctx, input).await?)
            }

            Operation::CreatePolicy(input) => Out::Policy(coverage.create_policy(ctx, input).await?),
            Operation::RenewPolicy(input) => Out::Policy(coverage.renew_policy(ctx, input).await?),
            Operation::SuspendPolicy(input) => Out::Policy(coverage.suspend_policy(ctx, input).await?),
            Operation::ReinstatePolicy(r) => {
                Out::Policy(coverage.reinstate_policy(ctx, r.policy_id).await?)
            }
            Operation::GetPolicy(r) => Out::Policy(coverage.get_policy(ctx, r.policy_id).await?),
            Operation::FamilyPolicies(r) => {
                Out::Policies(coverage.family_policies(ctx, r.family_id).await?)
            }

            Operation::SubmitClaim(input) => Out::Claim(claims.submit_claim(ctx, input).await?),
            Operation::ProcessClaim(input) => Out::Claim(claims.process_claim(ctx, input).await?),
            Operation::GetClaim(r) => Out::Claim(claims.get_claim(ctx, r.claim_id).await?),
            Operation::ClaimHistory(r) => {
                Out::ClaimHistory(claims.claim_history(ctx, r.claim_id).await?)
            }
            Operation::InsureeClaims(r) => {
                Out::Claims(claims.insuree_claims(ctx, r.insuree_id).await?)
            }
        })
    }
}
