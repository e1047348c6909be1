//! Household service
//!
//! Families, insurees and the memberships linking them. Every mutation that
//! touches head status ends with [`HouseholdService::sync_family`], which
//! recomputes the family's head reference and member count and re-checks the
//! head invariant before the unit of work commits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use core_kernel::{Clock, CoreError, FamilyId, InsureeId, MembershipId, OperationContext};
use domain_household::{
    check_head_invariant, select_successor, Family, FamilyChanges, FamilyDetails,
    FamilyMembership, HouseholdError, Insuree, InsureeChanges, InsureeDetails, InsureeStatus,
    MembershipStatus, SuccessionCandidate,
};
use domain_reference::{ReferenceData, ReferenceKind};

use crate::audit::{AuditEntry, EntityKind};
use crate::config::{HeadReplacementPolicy, ServiceConfig};
use crate::in_unit_of_work;
use crate::ports::{Store, UnitOfWork};

// ============================================================================
// Inputs
// ============================================================================

/// Input for `createInsuree`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInsuree {
    #[serde(flatten)]
    pub details: InsureeDetails,
    /// Family to join in the same unit of work
    #[serde(default)]
    pub family_id: Option<FamilyId>,
    #[serde(default)]
    pub is_head: bool,
    #[serde(default)]
    pub relationship_code: Option<String>,
    /// Demote an existing head instead of failing
    #[serde(default)]
    pub replace_head: bool,
    /// Membership start date, today when omitted
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// Input for `addFamilyMember`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFamilyMember {
    pub family_id: FamilyId,
    pub insuree_id: InsureeId,
    #[serde(default)]
    pub relationship_code: Option<String>,
    #[serde(default)]
    pub is_head: bool,
    #[serde(default)]
    pub replace_head: bool,
    /// Membership start date, today when omitted
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// Input for `transferFamilyMember`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFamilyMember {
    pub membership_id: MembershipId,
    pub new_family_id: FamilyId,
    /// End of the source and start of the destination membership, today when omitted
    #[serde(default)]
    pub transfer_date: Option<NaiveDate>,
}

/// Input for `removeFamilyMember`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFamilyMember {
    pub membership_id: MembershipId,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Input for `setHeadOfFamily`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetHeadOfFamily {
    pub family_id: FamilyId,
    pub insuree_id: InsureeId,
}

/// Input for `updateFamily`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFamily {
    pub family_id: FamilyId,
    #[serde(flatten)]
    pub changes: FamilyChanges,
}

/// Input for `updateInsuree`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInsuree {
    pub insuree_id: InsureeId,
    #[serde(flatten)]
    pub changes: InsureeChanges,
}

/// Input for `changeInsureeStatus`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInsureeStatus {
    pub insuree_id: InsureeId,
    pub status: InsureeStatus,
}

// ============================================================================
// Service
// ============================================================================

/// Household operations over a [`Store`]
pub struct HouseholdService {
    store: Arc<dyn Store>,
    reference: Arc<dyn ReferenceData>,
    config: Arc<ServiceConfig>,
    clock: Arc<dyn Clock>,
}

impl HouseholdService {
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

    /// Creates a family without members
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - malformed fields or unknown family type/location
    /// * `DUPLICATE_ENTRY` - the confirmation number is already used
    pub async fn create_family(
        &self,
        ctx: &OperationContext,
        details: FamilyDetails,
    ) -> Result<Family, CoreError> {
        ctx.ensure_authorized("createFamily")?;
        details.validate_with(self.reference.as_ref())?;

        let family = in_unit_of_work!(self, "createFamily", |uow| {
            self.create_family_in(uow, ctx, &details)
        })?;

        info!(
            operation = "createFamily",
            family_id = %family.id,
            correlation_id = ?ctx.correlation_id,
            "Family created"
        );
        Ok(family)
    }

    async fn create_family_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        details: &FamilyDetails,
    ) -> Result<Family, CoreError> {
        if let Some(no) = &details.confirmation_no {
            if uow.family_by_confirmation_no(no).await?.is_some() {
                return Err(CoreError::duplicate("confirmationNo", no));
            }
        }

        let now = self.clock.now();
        let family = Family::create(details.clone(), &ctx.actor, now);
        uow.save_family(&family).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "createFamily",
            EntityKind::Family,
            family.id,
            "created",
            now,
        ))
        .await?;
        Ok(family)
    }

    /// Registers an insuree, optionally joining a family in the same unit of work
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - malformed fields, unknown codes, `isHead` or
    ///   `startDate` without `familyId`, or a `startDate` in the future or
    ///   before the date of birth
    /// * `DUPLICATE_ENTRY` - the chfId is already registered
    /// * `NOT_FOUND` - the family does not exist
    /// * `INVALID_STATE` - the family is inactive, or already has a head and
    ///   neither `replaceHead` nor the auto-demote policy applies
    pub async fn create_insuree(
        &self,
        ctx: &OperationContext,
        input: CreateInsuree,
    ) -> Result<Insuree, CoreError> {
        ctx.ensure_authorized("createInsuree")?;
        input
            .details
            .validate_with(self.reference.as_ref(), self.clock.today())?;
        if input.is_head && input.family_id.is_none() {
            return Err(CoreError::validation_field(
                "familyId",
                "isHead requires familyId",
            ));
        }
        if input.start_date.is_some() && input.family_id.is_none() {
            return Err(CoreError::validation_field(
                "familyId",
                "startDate requires familyId",
            ));
        }
        self.check_relationship(input.relationship_code.as_deref())?;
        let start_date = self.membership_date("startDate", input.start_date)?;
        check_born_by("startDate", start_date, input.details.dob)?;

        let insuree = in_unit_of_work!(self, "createInsuree", |uow| {
            self.create_insuree_in(uow, ctx, &input, start_date)
        })?;

        info!(
            operation = "createInsuree",
            insuree_id = %insuree.id,
            family_id = ?input.family_id.map(|id| id.to_string()),
            correlation_id = ?ctx.correlation_id,
            "Insuree registered"
        );
        Ok(insuree)
    }

    async fn create_insuree_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &CreateInsuree,
        start_date: NaiveDate,
    ) -> Result<Insuree, CoreError> {
        if uow.insuree_by_chf_id(&input.details.chf_id).await?.is_some() {
            return Err(CoreError::duplicate("chfId", &input.details.chf_id));
        }

        let mut family = match input.family_id {
            Some(family_id) => {
                let family = locked_family(uow, family_id).await?;
                family.ensure_active()?;
                Some(family)
            }
            None => None,
        };

        let now = self.clock.now();
        let insuree = Insuree::register(input.details.clone(), &ctx.actor, now);
        uow.save_insuree(&insuree).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "createInsuree",
            EntityKind::Insuree,
            insuree.id,
            "registered",
            now,
        ))
        .await?;

        if let Some(family) = family.as_mut() {
            self.join_family(
                uow,
                ctx,
                "createInsuree",
                family,
                insuree.id,
                input.relationship_code.clone(),
                input.is_head,
                input.replace_head,
                start_date,
                now,
            )
            .await?;
        }
        Ok(insuree)
    }

    /// Adds an existing insuree to a family
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - unknown relationship code, or a `startDate` in
    ///   the future or before the insuree's date of birth
    /// * `NOT_FOUND` - the family or the insuree does not exist
    /// * `INVALID_STATE` - the insuree already has an active membership, the
    ///   insuree is not active, the family is inactive, or the head is taken
    pub async fn add_family_member(
        &self,
        ctx: &OperationContext,
        input: AddFamilyMember,
    ) -> Result<FamilyMembership, CoreError> {
        ctx.ensure_authorized("addFamilyMember")?;
        self.check_relationship(input.relationship_code.as_deref())?;
        let start_date = self.membership_date("startDate", input.start_date)?;

        let membership = in_unit_of_work!(self, "addFamilyMember", |uow| {
            self.add_family_member_in(uow, ctx, &input, start_date)
        })?;

        info!(
            operation = "addFamilyMember",
            family_id = %membership.family_id,
            insuree_id = %membership.insuree_id,
            membership_id = %membership.id,
            is_head = membership.is_head,
            correlation_id = ?ctx.correlation_id,
            "Member added to family"
        );
        Ok(membership)
    }

    async fn add_family_member_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &AddFamilyMember,
        start_date: NaiveDate,
    ) -> Result<FamilyMembership, CoreError> {
        let mut family = locked_family(uow, input.family_id).await?;
        let insuree = locked_insuree(uow, input.insuree_id).await?;
        family.ensure_active()?;
        insuree.ensure_active()?;
        check_born_by("startDate", start_date, insuree.dob)?;

        self.join_family(
            uow,
            ctx,
            "addFamilyMember",
            &mut family,
            insuree.id,
            input.relationship_code.clone(),
            input.is_head,
            input.replace_head,
            start_date,
            self.clock.now(),
        )
        .await
    }

    /// Moves a member to another family
    ///
    /// The source membership ends as TRANSFERRED and a non-head membership
    /// starts in the destination family, both on the transfer date. A
    /// departing head is succeeded.
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - a `transferDate` in the future, before the
    ///   insuree's date of birth, or before the source membership started
    /// * `NOT_FOUND` - the membership or the destination family does not exist
    /// * `INVALID_STATE` - the membership is not active, the destination is
    ///   the source family, or the destination family is inactive
    pub async fn transfer_family_member(
        &self,
        ctx: &OperationContext,
        input: TransferFamilyMember,
    ) -> Result<FamilyMembership, CoreError> {
        ctx.ensure_authorized("transferFamilyMember")?;
        let transfer_date = self.membership_date("transferDate", input.transfer_date)?;

        let membership = in_unit_of_work!(self, "transferFamilyMember", |uow| {
            self.transfer_family_member_in(uow, ctx, &input, transfer_date)
        })?;

        info!(
            operation = "transferFamilyMember",
            source_membership_id = %input.membership_id,
            membership_id = %membership.id,
            family_id = %membership.family_id,
            correlation_id = ?ctx.correlation_id,
            "Member transferred"
        );
        Ok(membership)
    }

    async fn transfer_family_member_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &TransferFamilyMember,
        transfer_date: NaiveDate,
    ) -> Result<FamilyMembership, CoreError> {
        const ACTION: &str = "transferFamilyMember";

        let current = existing_membership(uow, input.membership_id).await?;
        current.ensure_active()?;
        if current.family_id == input.new_family_id {
            return Err(HouseholdError::SameFamily(input.new_family_id.to_string()).into());
        }

        // Both families are locked in id order
        let (mut source, mut destination) = if current.family_id < input.new_family_id {
            let source = locked_family(uow, current.family_id).await?;
            let destination = locked_family(uow, input.new_family_id).await?;
            (source, destination)
        } else {
            let destination = locked_family(uow, input.new_family_id).await?;
            let source = locked_family(uow, current.family_id).await?;
            (source, destination)
        };
        destination.ensure_active()?;

        let now = self.clock.now();
        let mut membership = existing_membership(uow, input.membership_id).await?;
        let insuree = existing_insuree(uow, membership.insuree_id).await?;
        check_born_by("transferDate", transfer_date, insuree.dob)?;
        let moved = membership.transfer_to(destination.id, transfer_date, &ctx.actor, now)?;

        uow.save_membership(&membership).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            ACTION,
            EntityKind::Membership,
            membership.id,
            format!("transferred to family {}", destination.id),
            now,
        ))
        .await?;
        uow.save_membership(&moved).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            ACTION,
            EntityKind::Membership,
            moved.id,
            format!("joined family {} by transfer", destination.id),
            now,
        ))
        .await?;

        if membership.is_head {
            self.promote_successor(uow, ctx, ACTION, source.id, now).await?;
        }
        self.sync_family(uow, ctx, ACTION, &mut source, now).await?;
        self.sync_family(uow, ctx, ACTION, &mut destination, now).await?;
        Ok(moved)
    }

    /// Ends a membership as INACTIVE; a departing head is succeeded
    ///
    /// # Errors
    ///
    /// * `NOT_FOUND` - the membership does not exist
    /// * `INVALID_STATE` - the membership has already ended
    pub async fn remove_family_member(
        &self,
        ctx: &OperationContext,
        input: RemoveFamilyMember,
    ) -> Result<FamilyMembership, CoreError> {
        ctx.ensure_authorized("removeFamilyMember")?;

        let membership = in_unit_of_work!(self, "removeFamilyMember", |uow| {
            self.remove_family_member_in(uow, ctx, &input)
        })?;

        info!(
            operation = "removeFamilyMember",
            membership_id = %membership.id,
            family_id = %membership.family_id,
            correlation_id = ?ctx.correlation_id,
            "Member removed from family"
        );
        Ok(membership)
    }

    async fn remove_family_member_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &RemoveFamilyMember,
    ) -> Result<FamilyMembership, CoreError> {
        const ACTION: &str = "removeFamilyMember";

        let current = existing_membership(uow, input.membership_id).await?;
        let mut family = locked_family(uow, current.family_id).await?;
        let mut membership = existing_membership(uow, input.membership_id).await?;

        let now = self.clock.now();
        membership.end(
            MembershipStatus::Inactive,
            input.reason.as_deref(),
            &ctx.actor,
            now,
        )?;
        uow.save_membership(&membership).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            ACTION,
            EntityKind::Membership,
            membership.id,
            "ended",
            now,
        ))
        .await?;

        if membership.is_head {
            self.promote_successor(uow, ctx, ACTION, family.id, now).await?;
        }
        self.sync_family(uow, ctx, ACTION, &mut family, now).await?;
        Ok(membership)
    }

    /// Makes an active member the head, demoting the current head
    ///
    /// Naming the current head again changes nothing.
    ///
    /// # Errors
    ///
    /// * `NOT_FOUND` - the family does not exist
    /// * `INVALID_STATE` - the family is inactive, the insuree is not an
    ///   active member of it, or the insuree is not active
    pub async fn set_head_of_family(
        &self,
        ctx: &OperationContext,
        input: SetHeadOfFamily,
    ) -> Result<FamilyMembership, CoreError> {
        ctx.ensure_authorized("setHeadOfFamily")?;

        let membership = in_unit_of_work!(self, "setHeadOfFamily", |uow| {
            self.set_head_of_family_in(uow, ctx, &input)
        })?;

        info!(
            operation = "setHeadOfFamily",
            family_id = %input.family_id,
            insuree_id = %input.insuree_id,
            correlation_id = ?ctx.correlation_id,
            "Head of family set"
        );
        Ok(membership)
    }

    async fn set_head_of_family_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &SetHeadOfFamily,
    ) -> Result<FamilyMembership, CoreError> {
        const ACTION: &str = "setHeadOfFamily";

        let mut family = locked_family(uow, input.family_id).await?;
        family.ensure_active()?;

        let members = uow.active_memberships_of_family(family.id).await?;
        let mut target = members
            .iter()
            .find(|m| m.insuree_id == input.insuree_id)
            .cloned()
            .ok_or_else(|| HouseholdError::NotAMember {
                insuree: input.insuree_id.to_string(),
                family: family.id.to_string(),
            })?;
        if target.is_head {
            debug!(family_id = %family.id, "Insuree is already head");
            return Ok(target);
        }
        existing_insuree(uow, target.insuree_id).await?.ensure_active()?;

        let now = self.clock.now();
        if let Some(mut head) = members.into_iter().find(|m| m.is_head) {
            head.set_head(false, &ctx.actor, now);
            uow.save_membership(&head).await?;
            uow.append_audit(&AuditEntry::record(
                ctx,
                ACTION,
                EntityKind::Membership,
                head.id,
                "demoted from head",
                now,
            ))
            .await?;
        }

        target.set_head(true, &ctx.actor, now);
        uow.save_membership(&target).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            ACTION,
            EntityKind::Membership,
            target.id,
            "promoted to head",
            now,
        ))
        .await?;

        self.sync_family(uow, ctx, ACTION, &mut family, now).await?;
        Ok(target)
    }

    /// Applies a partial update to an active family
    pub async fn update_family(
        &self,
        ctx: &OperationContext,
        input: UpdateFamily,
    ) -> Result<Family, CoreError> {
        ctx.ensure_authorized("updateFamily")?;
        input.changes.validate_with(self.reference.as_ref())?;

        let family = in_unit_of_work!(self, "updateFamily", |uow| {
            self.update_family_in(uow, ctx, &input)
        })?;

        info!(
            operation = "updateFamily",
            family_id = %family.id,
            correlation_id = ?ctx.correlation_id,
            "Family updated"
        );
        Ok(family)
    }

    async fn update_family_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &UpdateFamily,
    ) -> Result<Family, CoreError> {
        let mut family = locked_family(uow, input.family_id).await?;
        family.ensure_active()?;

        if let Some(no) = &input.changes.confirmation_no {
            if let Some(other) = uow.family_by_confirmation_no(no).await? {
                if other.id != family.id {
                    return Err(CoreError::duplicate("confirmationNo", no));
                }
            }
        }

        let now = self.clock.now();
        family.apply(input.changes.clone(), &ctx.actor, now);
        uow.save_family(&family).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "updateFamily",
            EntityKind::Family,
            family.id,
            "updated",
            now,
        ))
        .await?;
        Ok(family)
    }

    /// Deactivates a family and ends all of its memberships
    ///
    /// # Errors
    ///
    /// * `NOT_FOUND` - the family does not exist
    /// * `INVALID_STATE` - the family is already inactive or has an active or
    ///   suspended policy
    pub async fn delete_family(
        &self,
        ctx: &OperationContext,
        family_id: FamilyId,
    ) -> Result<Family, CoreError> {
        ctx.ensure_authorized("deleteFamily")?;

        let family = in_unit_of_work!(self, "deleteFamily", |uow| {
            self.delete_family_in(uow, ctx, family_id)
        })?;

        info!(
            operation = "deleteFamily",
            family_id = %family.id,
            correlation_id = ?ctx.correlation_id,
            "Family deactivated"
        );
        Ok(family)
    }

    async fn delete_family_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        family_id: FamilyId,
    ) -> Result<Family, CoreError> {
        const ACTION: &str = "deleteFamily";

        let mut family = locked_family(uow, family_id).await?;
        family.ensure_active()?;

        let today = self.clock.today();
        let policies = uow.policies_of_family(family.id).await?;
        if let Some(live) = policies.iter().find(|p| p.is_live_on(today)) {
            return Err(CoreError::invalid_state(format!(
                "family {} has policy {} in status {}",
                family.id,
                live.id,
                live.status_on(today)
            )));
        }

        let now = self.clock.now();
        for mut membership in uow.active_memberships_of_family(family.id).await? {
            membership.end(
                MembershipStatus::Inactive,
                Some("family deleted"),
                &ctx.actor,
                now,
            )?;
            uow.save_membership(&membership).await?;
            uow.append_audit(&AuditEntry::record(
                ctx,
                ACTION,
                EntityKind::Membership,
                membership.id,
                "ended with family",
                now,
            ))
            .await?;
        }

        family.deactivate(&ctx.actor, now)?;
        check_head_invariant(&family, &[])?;
        uow.save_family(&family).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            ACTION,
            EntityKind::Family,
            family.id,
            "deactivated",
            now,
        ))
        .await?;
        Ok(family)
    }

    /// Applies a partial update to an insuree
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` - no fields supplied, malformed fields or unknown codes
    /// * `NOT_FOUND` - the insuree does not exist
    /// * `DUPLICATE_ENTRY` - the new chfId belongs to another insuree
    pub async fn update_insuree(
        &self,
        ctx: &OperationContext,
        input: UpdateInsuree,
    ) -> Result<Insuree, CoreError> {
        ctx.ensure_authorized("updateInsuree")?;
        if input.changes.is_empty() {
            return Err(CoreError::validation("at least one field must be supplied"));
        }
        input
            .changes
            .validate_with(self.reference.as_ref(), self.clock.today())?;

        let insuree = in_unit_of_work!(self, "updateInsuree", |uow| {
            self.update_insuree_in(uow, ctx, &input)
        })?;

        info!(
            operation = "updateInsuree",
            insuree_id = %insuree.id,
            correlation_id = ?ctx.correlation_id,
            "Insuree updated"
        );
        Ok(insuree)
    }

    async fn update_insuree_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        input: &UpdateInsuree,
    ) -> Result<Insuree, CoreError> {
        let mut insuree = locked_insuree(uow, input.insuree_id).await?;

        if let Some(chf_id) = &input.changes.chf_id {
            if let Some(other) = uow.insuree_by_chf_id(chf_id).await? {
                if other.id != insuree.id {
                    return Err(CoreError::duplicate("chfId", chf_id));
                }
            }
        }

        let now = self.clock.now();
        insuree.apply(input.changes.clone(), &ctx.actor, now);
        uow.save_insuree(&insuree).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            "updateInsuree",
            EntityKind::Insuree,
            insuree.id,
            "updated",
            now,
        ))
        .await?;
        Ok(insuree)
    }

    /// Moves an insuree to a new status
    ///
    /// INACTIVE and DECEASED end the insuree's active membership, with head
    /// succession in the family they leave.
    ///
    /// # Errors
    ///
    /// * `NOT_FOUND` - the insuree does not exist
    /// * `INVALID_STATE` - the insuree is deceased or already in that status
    pub async fn change_insuree_status(
        &self,
        ctx: &OperationContext,
        input: ChangeInsureeStatus,
    ) -> Result<Insuree, CoreError> {
        ctx.ensure_authorized("changeInsureeStatus")?;

        let insuree = in_unit_of_work!(self, "changeInsureeStatus", |uow| {
            self.change_status_in(uow, ctx, "changeInsureeStatus", input.insuree_id, input.status)
        })?;

        info!(
            operation = "changeInsureeStatus",
            insuree_id = %insuree.id,
            status = %insuree.status,
            correlation_id = ?ctx.correlation_id,
            "Insuree status changed"
        );
        Ok(insuree)
    }

    /// Soft-deletes an insuree by moving it to INACTIVE
    pub async fn delete_insuree(
        &self,
        ctx: &OperationContext,
        insuree_id: InsureeId,
    ) -> Result<Insuree, CoreError> {
        ctx.ensure_authorized("deleteInsuree")?;

        let insuree = in_unit_of_work!(self, "deleteInsuree", |uow| {
            self.change_status_in(uow, ctx, "deleteInsuree", insuree_id, InsureeStatus::Inactive)
        })?;

        info!(
            operation = "deleteInsuree",
            insuree_id = %insuree.id,
            correlation_id = ?ctx.correlation_id,
            "Insuree deleted"
        );
        Ok(insuree)
    }

    async fn change_status_in(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        action: &str,
        insuree_id: InsureeId,
        status: InsureeStatus,
    ) -> Result<Insuree, CoreError> {
        // Family first, then insuree
        let mut family = match uow.active_membership_of_insuree(insuree_id).await? {
            Some(membership) => Some(locked_family(uow, membership.family_id).await?),
            None => None,
        };
        let mut insuree = locked_insuree(uow, insuree_id).await?;

        let now = self.clock.now();
        insuree.change_status(status, &ctx.actor, now)?;
        uow.save_insuree(&insuree).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            action,
            EntityKind::Insuree,
            insuree.id,
            format!("status {}", insuree.status),
            now,
        ))
        .await?;

        let ends_membership = matches!(status, InsureeStatus::Inactive | InsureeStatus::Deceased);
        if let (true, Some(family)) = (ends_membership, family.as_mut()) {
            let Some(mut membership) = uow.active_membership_of_insuree(insuree_id).await? else {
                return Err(CoreError::Transient(format!(
                    "membership of insuree {} changed concurrently",
                    insuree_id
                )));
            };
            if membership.family_id != family.id {
                return Err(CoreError::Transient(format!(
                    "membership of insuree {} changed concurrently",
                    insuree_id
                )));
            }

            let ended_as = match status {
                InsureeStatus::Deceased => MembershipStatus::Deceased,
                _ => MembershipStatus::Inactive,
            };
            membership.end(ended_as, None, &ctx.actor, now)?;
            uow.save_membership(&membership).await?;
            uow.append_audit(&AuditEntry::record(
                ctx,
                action,
                EntityKind::Membership,
                membership.id,
                format!("ended as {}", ended_as),
                now,
            ))
            .await?;

            if membership.is_head {
                self.promote_successor(uow, ctx, action, family.id, now).await?;
            }
            self.sync_family(uow, ctx, action, family, now).await?;
        }
        Ok(insuree)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_family(
        &self,
        ctx: &OperationContext,
        family_id: FamilyId,
    ) -> Result<Family, CoreError> {
        ctx.ensure_authorized("getFamily")?;
        in_unit_of_work!(self, "getFamily", |uow| existing_family(uow, family_id))
    }

    pub async fn get_insuree(
        &self,
        ctx: &OperationContext,
        insuree_id: InsureeId,
    ) -> Result<Insuree, CoreError> {
        ctx.ensure_authorized("getInsuree")?;
        in_unit_of_work!(self, "getInsuree", |uow| existing_insuree(uow, insuree_id))
    }

    pub async fn find_insuree_by_chf_id(
        &self,
        ctx: &OperationContext,
        chf_id: &str,
    ) -> Result<Insuree, CoreError> {
        ctx.ensure_authorized("findInsureeByChfId")?;
        in_unit_of_work!(self, "findInsureeByChfId", |uow| insuree_with_chf_id(uow, chf_id))
    }

    /// Active memberships of a family, oldest first
    pub async fn family_members(
        &self,
        ctx: &OperationContext,
        family_id: FamilyId,
    ) -> Result<Vec<FamilyMembership>, CoreError> {
        ctx.ensure_authorized("familyMembers")?;
        in_unit_of_work!(self, "familyMembers", |uow| members_of_family(uow, family_id))
    }

    /// Every membership an insuree ever held, oldest first
    pub async fn membership_history(
        &self,
        ctx: &OperationContext,
        insuree_id: InsureeId,
    ) -> Result<Vec<FamilyMembership>, CoreError> {
        ctx.ensure_authorized("membershipHistory")?;
        in_unit_of_work!(self, "membershipHistory", |uow| memberships_of_insuree(uow, insuree_id))
    }

    // ========================================================================
    // Membership helpers
    // ========================================================================

    fn check_relationship(&self, code: Option<&str>) -> Result<(), CoreError> {
        match code {
            Some(code) if !self.reference.is_known(ReferenceKind::Relationship, code) => Err(
                CoreError::validation_field(
                    "relationshipCode",
                    format!("unknown relationship code '{}'", code),
                ),
            ),
            _ => Ok(()),
        }
    }

    /// The requested membership date, or today
    fn membership_date(
        &self,
        field: &str,
        requested: Option<NaiveDate>,
    ) -> Result<NaiveDate, CoreError> {
        let today = self.clock.today();
        match requested {
            Some(date) if date > today => Err(CoreError::validation_field(
                field,
                format!("{} is in the future", date),
            )),
            Some(date) => Ok(date),
            None => Ok(today),
        }
    }

    /// Starts a membership in a locked, active family
    #[allow(clippy::too_many_arguments)]
    async fn join_family(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        action: &str,
        family: &mut Family,
        insuree_id: InsureeId,
        relationship_code: Option<String>,
        is_head: bool,
        replace_head: bool,
        start_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<FamilyMembership, CoreError> {
        if let Some(existing) = uow.active_membership_of_insuree(insuree_id).await? {
            return Err(HouseholdError::AlreadyMember {
                insuree: insuree_id.to_string(),
                family: existing.family_id.to_string(),
            }
            .into());
        }

        if is_head {
            let members = uow.active_memberships_of_family(family.id).await?;
            if let Some(mut head) = members.into_iter().find(|m| m.is_head) {
                let demote = replace_head
                    || self.config.head_replacement == HeadReplacementPolicy::AutoDemote;
                if !demote {
                    return Err(HouseholdError::HeadAlreadyAssigned {
                        family: family.id.to_string(),
                        head: head.insuree_id.to_string(),
                    }
                    .into());
                }
                head.set_head(false, &ctx.actor, now);
                uow.save_membership(&head).await?;
                uow.append_audit(&AuditEntry::record(
                    ctx,
                    action,
                    EntityKind::Membership,
                    head.id,
                    "demoted from head",
                    now,
                ))
                .await?;
            }
        }

        let membership = FamilyMembership::start(
            family.id,
            insuree_id,
            relationship_code,
            is_head,
            start_date,
            &ctx.actor,
            now,
        );
        uow.save_membership(&membership).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            action,
            EntityKind::Membership,
            membership.id,
            format!("joined family {}", family.id),
            now,
        ))
        .await?;

        self.sync_family(uow, ctx, action, family, now).await?;
        Ok(membership)
    }

    /// Promotes a successor if the family has active members but no head
    async fn promote_successor(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        action: &str,
        family_id: FamilyId,
        now: DateTime<Utc>,
    ) -> Result<Option<FamilyMembership>, CoreError> {
        let members = uow.active_memberships_of_family(family_id).await?;
        if members.is_empty() || members.iter().any(|m| m.is_head) {
            return Ok(None);
        }

        let ids: Vec<InsureeId> = members.iter().map(|m| m.insuree_id).collect();
        let insurees = uow.insurees(&ids).await?;
        let candidates: Vec<SuccessionCandidate<'_>> = members
            .iter()
            .filter_map(|membership| {
                insurees
                    .iter()
                    .find(|i| i.id == membership.insuree_id)
                    .map(|insuree| SuccessionCandidate { membership, insuree })
            })
            .collect();

        let today = now.date_naive();
        let Some(chosen) = select_successor(&candidates, today, self.config.age_of_majority) else {
            return Ok(None);
        };
        let Some(mut successor) = members.into_iter().find(|m| m.id == chosen) else {
            return Ok(None);
        };

        successor.set_head(true, &ctx.actor, now);
        uow.save_membership(&successor).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            action,
            EntityKind::Membership,
            successor.id,
            "promoted to head by succession",
            now,
        ))
        .await?;

        info!(
            operation = action,
            family_id = %family_id,
            insuree_id = %successor.insuree_id,
            "Head succession"
        );
        Ok(Some(successor))
    }

    /// Recomputes head reference and member count, then checks the head invariant
    async fn sync_family(
        &self,
        uow: &mut dyn UnitOfWork,
        ctx: &OperationContext,
        action: &str,
        family: &mut Family,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let members = uow.active_memberships_of_family(family.id).await?;
        let head = members.iter().find(|m| m.is_head).map(|m| m.insuree_id);
        family.record_membership(head, members.len() as u32, &ctx.actor, now);
        check_head_invariant(family, &members)?;

        uow.save_family(family).await?;
        uow.append_audit(&AuditEntry::record(
            ctx,
            action,
            EntityKind::Family,
            family.id,
            format!("{} active members", family.member_count),
            now,
        ))
        .await?;
        Ok(())
    }
}

fn check_born_by(field: &str, date: NaiveDate, dob: NaiveDate) -> Result<(), CoreError> {
    if date < dob {
        return Err(CoreError::validation_field(
            field,
            format!("{} precedes the date of birth {}", date, dob),
        ));
    }
    Ok(())
}

// ============================================================================
// Lookups
// ============================================================================

async fn locked_family(uow: &mut dyn UnitOfWork, id: FamilyId) -> Result<Family, CoreError> {
    uow.lock_family(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Family", id))
}

async fn locked_insuree(uow: &mut dyn UnitOfWork, id: InsureeId) -> Result<Insuree, CoreError> {
    uow.lock_insuree(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Insuree", id))
}

async fn existing_family(uow: &mut dyn UnitOfWork, id: FamilyId) -> Result<Family, CoreError> {
    uow.family(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Family", id))
}

async fn existing_insuree(uow: &mut dyn UnitOfWork, id: InsureeId) -> Result<Insuree, CoreError> {
    uow.insuree(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Insuree", id))
}

async fn existing_membership(
    uow: &mut dyn UnitOfWork,
    id: MembershipId,
) -> Result<FamilyMembership, CoreError> {
    uow.membership(id)
        .await?
        .ok_or_else(|| CoreError::not_found("FamilyMembership", id))
}

async fn insuree_with_chf_id(uow: &mut dyn UnitOfWork, chf_id: &str) -> Result<Insuree, CoreError> {
    uow.insuree_by_chf_id(chf_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Insuree", chf_id))
}

async fn members_of_family(
    uow: &mut dyn UnitOfWork,
    family_id: FamilyId,
) -> Result<Vec<FamilyMembership>, CoreError> {
    existing_family(uow, family_id).await?;
    Ok(uow.active_memberships_of_family(family_id).await?)
}

async fn memberships_of_insuree(
    uow: &mut dyn UnitOfWork,
    insuree_id: InsureeId,
) -> Result<Vec<FamilyMembership>, CoreError> {
    existing_insuree(uow, insuree_id).await?;
    Ok(uow.memberships_of_insuree(insuree_id).await?)
}
