//! Head-of-family rules
//!
//! These functions are pure; services call them with the family's current
//! active memberships after applying a change and before committing.

use chrono::NaiveDate;

use core_kernel::MembershipId;

use crate::error::HouseholdError;
use crate::family::Family;
use crate::insuree::Insuree;
use crate::membership::FamilyMembership;

/// An active member considered for promotion to head
#[derive(Debug, Clone, Copy)]
pub struct SuccessionCandidate<'a> {
    pub membership: &'a FamilyMembership,
    pub insuree: &'a Insuree,
}

/// Picks the member to promote when the head leaves
///
/// Only active insurees holding an active, non-head membership qualify. The
/// oldest adult wins; without adults the oldest member wins. Ties on date of
/// birth go to the longest-standing membership.
pub fn select_successor(
    candidates: &[SuccessionCandidate<'_>],
    today: NaiveDate,
    age_of_majority: u32,
) -> Option<MembershipId> {
    let eligible = || {
        candidates.iter().filter(|c| {
            c.membership.is_active() && !c.membership.is_head && c.insuree.is_active()
        })
    };
    let seniority = |c: &&SuccessionCandidate<'_>| {
        (c.insuree.dob, c.membership.start_date, c.membership.id)
    };

    eligible()
        .filter(|c| c.insuree.is_adult_on(today, age_of_majority))
        .min_by_key(seniority)
        .or_else(|| eligible().min_by_key(seniority))
        .map(|c| c.membership.id)
}

/// Verifies the head invariant for a family
///
/// `memberships` must contain every active membership of the family; ended
/// memberships are ignored.
///
/// # Errors
///
/// Returns `HeadInvariant` if more than one active head exists, if the
/// family's head reference does not name the active head, or if the
/// recorded member count is stale.
pub fn check_head_invariant(
    family: &Family,
    memberships: &[FamilyMembership],
) -> Result<(), HouseholdError> {
    let active: Vec<&FamilyMembership> = memberships
        .iter()
        .filter(|m| m.family_id == family.id && m.is_active())
        .collect();
    let heads: Vec<&&FamilyMembership> = active.iter().filter(|m| m.is_head).collect();

    if heads.len() > 1 {
        return Err(HouseholdError::head_invariant(
            family.id,
            format!("{} active heads", heads.len()),
        ));
    }

    let head_insuree = heads.first().map(|m| m.insuree_id);
    if head_insuree != family.head_insuree_id {
        return Err(HouseholdError::head_invariant(
            family.id,
            "head reference does not match the active head membership",
        ));
    }

    if family.member_count as usize != active.len() {
        return Err(HouseholdError::head_invariant(
            family.id,
            format!(
                "member count {} does not match {} active memberships",
                family.member_count,
                active.len()
            ),
        ));
    }

    Ok(())
}
