//! Household service tests over the in-memory store

mod common;

use chrono::Duration;

use app_services::{
    AddFamilyMember, ChangeInsureeStatus, CreateInsuree, HeadReplacementPolicy,
    RemoveFamilyMember, ServiceConfig, SetHeadOfFamily, TransferFamilyMember, UpdateInsuree,
};
use common::Harness;
use core_kernel::ErrorCode;
use domain_household::{FamilyChanges, InsureeChanges, InsureeStatus, MembershipStatus};
use test_utils::{
    assert_error_code, assert_error_field, ContextFixtures, DateFixtures, HouseholdFixtures,
    IdFixtures, InsureeDetailsBuilder, PolicyDatesBuilder, ReferenceFixtures,
};

// ============================================================================
// Families and insurees
// ============================================================================

#[tokio::test]
async fn test_create_family_starts_empty() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;

    assert!(family.is_active);
    assert_eq!(family.member_count, 0);
    assert!(family.head_insuree_id.is_none());
    h.committed_family(family.id).await;
}

#[tokio::test]
async fn test_create_family_duplicate_confirmation_no() {
    let h = Harness::new();
    h.family("CONF-1").await;

    let result = h
        .services
        .household
        .create_family(&ContextFixtures::clerk(), HouseholdFixtures::family("CONF-1"))
        .await;

    assert_error_code(&result, ErrorCode::DuplicateEntry);
}

#[tokio::test]
async fn test_create_family_unknown_location() {
    let h = Harness::new();
    let mut details = HouseholdFixtures::family("CONF-1");
    details.location_code = Some("NOWHERE".to_string());

    let result = h
        .services
        .household
        .create_family(&ContextFixtures::clerk(), details)
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert!(h.snapshot().await.families.is_empty());
}

#[tokio::test]
async fn test_create_insuree_as_head_in_one_unit_of_work() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;

    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;

    let (family, members) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(head.id));
    assert_eq!(family.member_count, 1);
    assert_eq!(members.len(), 1);
    assert!(members[0].is_head);
}

#[tokio::test]
async fn test_create_insuree_duplicate_chf_id() {
    let h = Harness::new();
    h.loner(HouseholdFixtures::adult("100000001")).await;

    let result = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details: InsureeDetailsBuilder::new("100000001").build(),
                family_id: None,
                is_head: false,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::DuplicateEntry);
    assert_eq!(h.snapshot().await.insurees.len(), 1);
}

#[tokio::test]
async fn test_create_insuree_head_requires_family() {
    let h = Harness::new();

    let result = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details: HouseholdFixtures::adult("100000001"),
                family_id: None,
                is_head: true,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert_error_field(&result, "familyId");
}

#[tokio::test]
async fn test_create_insuree_future_dob() {
    let h = Harness::new();
    let details = HouseholdFixtures::born_on("100000001", DateFixtures::today() + Duration::days(1));

    let result = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details,
                family_id: None,
                is_head: false,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert_error_field(&result, "dob");
}

#[tokio::test]
async fn test_create_insuree_unknown_family_writes_nothing() {
    let h = Harness::new();
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details: HouseholdFixtures::adult("100000001"),
                family_id: Some(IdFixtures::unknown_family_id()),
                is_head: true,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::NotFound);
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_create_insuree_unknown_relationship() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;

    let result = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details: HouseholdFixtures::adult("100000001"),
                family_id: Some(family.id),
                is_head: false,
                relationship_code: Some("RL-999".to_string()),
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_field(&result, "relationshipCode");
}

#[tokio::test]
async fn test_find_insuree_by_chf_id() {
    let h = Harness::new();
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let ctx = ContextFixtures::clerk();

    let found = h
        .services
        .household
        .find_insuree_by_chf_id(&ctx, "100000001")
        .await
        .unwrap();
    assert_eq!(found.id, insuree.id);

    let missing = h.services.household.find_insuree_by_chf_id(&ctx, "999999999").await;
    assert_error_code(&missing, ErrorCode::NotFound);
}

// ============================================================================
// Head of family
// ============================================================================

#[tokio::test]
async fn test_second_head_rejected_and_nothing_written() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details: HouseholdFixtures::adult("100000002"),
                family_id: Some(family.id),
                is_head: true,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_replace_head_demotes_current_head() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let old_head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;

    let new_head = h
        .services
        .household
        .create_insuree(
            &ContextFixtures::clerk(),
            CreateInsuree {
                details: HouseholdFixtures::adult("100000002"),
                family_id: Some(family.id),
                is_head: true,
                relationship_code: Some(ReferenceFixtures::spouse().to_string()),
                replace_head: true,
                start_date: None,
            },
        )
        .await
        .unwrap();

    let (family, members) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(new_head.id));
    assert_eq!(family.member_count, 2);
    let demoted = members.iter().find(|m| m.insuree_id == old_head.id).unwrap();
    assert!(!demoted.is_head);
    assert!(demoted.is_active());
}

#[tokio::test]
async fn test_auto_demote_policy_replaces_head() {
    let h = Harness::with_config(ServiceConfig {
        head_replacement: HeadReplacementPolicy::AutoDemote,
        ..ServiceConfig::default()
    });
    let family = h.family("CONF-1").await;
    h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let insuree = h.loner(HouseholdFixtures::adult("100000002")).await;

    let membership = h.join(family.id, &insuree, true).await;

    assert!(membership.is_head);
    let (family, members) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(insuree.id));
    assert_eq!(members.iter().filter(|m| m.is_head).count(), 1);
}

#[tokio::test]
async fn test_set_head_switches_head() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let first = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let second = h.member(family.id, HouseholdFixtures::adult("100000002"), false).await;

    let membership = h
        .services
        .household
        .set_head_of_family(
            &ContextFixtures::clerk(),
            SetHeadOfFamily {
                family_id: family.id,
                insuree_id: second.id,
            },
        )
        .await
        .unwrap();

    assert!(membership.is_head);
    let (family, members) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(second.id));
    assert!(!members.iter().find(|m| m.insuree_id == first.id).unwrap().is_head);
}

#[tokio::test]
async fn test_set_head_to_current_head_changes_nothing() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let before = h.snapshot().await;

    let membership = h
        .services
        .household
        .set_head_of_family(
            &ContextFixtures::clerk(),
            SetHeadOfFamily {
                family_id: family.id,
                insuree_id: head.id,
            },
        )
        .await
        .unwrap();

    assert!(membership.is_head);
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_set_head_requires_membership() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let outsider = h.loner(HouseholdFixtures::adult("100000001")).await;

    let result = h
        .services
        .household
        .set_head_of_family(
            &ContextFixtures::clerk(),
            SetHeadOfFamily {
                family_id: family.id,
                insuree_id: outsider.id,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_set_head_to_suspended_member_rejected() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let suspended = h.member(family.id, HouseholdFixtures::adult("100000002"), false).await;
    h.services
        .household
        .change_insuree_status(
            &ContextFixtures::clerk(),
            ChangeInsureeStatus {
                insuree_id: suspended.id,
                status: InsureeStatus::Suspended,
            },
        )
        .await
        .unwrap();
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .set_head_of_family(
            &ContextFixtures::clerk(),
            SetHeadOfFamily {
                family_id: family.id,
                insuree_id: suspended.id,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
    assert_eq!(h.snapshot().await, before);
    let (family, _) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(head.id));
}

#[tokio::test]
async fn test_succession_skips_inactive_insurees() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let elder = h
        .member(
            family.id,
            HouseholdFixtures::born_on("100000002", DateFixtures::adult_dob() - Duration::days(3650)),
            false,
        )
        .await;
    let pending = h
        .member(
            family.id,
            HouseholdFixtures::born_on("100000003", DateFixtures::adult_dob() - Duration::days(365)),
            false,
        )
        .await;
    let younger = h
        .member(
            family.id,
            HouseholdFixtures::born_on("100000004", DateFixtures::adult_dob() + Duration::days(365)),
            false,
        )
        .await;
    let ctx = ContextFixtures::clerk();
    for (insuree, status) in [(&elder, InsureeStatus::Suspended), (&pending, InsureeStatus::Pending)] {
        h.services
            .household
            .change_insuree_status(
                &ctx,
                ChangeInsureeStatus {
                    insuree_id: insuree.id,
                    status,
                },
            )
            .await
            .unwrap();
    }

    h.services
        .household
        .delete_insuree(&ctx, head.id)
        .await
        .unwrap();

    let (family, members) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(younger.id));
    assert_eq!(members.len(), 3);
}

#[tokio::test]
async fn test_no_successor_when_only_suspended_members_remain() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let suspended = h.member(family.id, HouseholdFixtures::adult("100000002"), false).await;
    let ctx = ContextFixtures::clerk();
    h.services
        .household
        .change_insuree_status(
            &ctx,
            ChangeInsureeStatus {
                insuree_id: suspended.id,
                status: InsureeStatus::Suspended,
            },
        )
        .await
        .unwrap();

    h.services.household.delete_insuree(&ctx, head.id).await.unwrap();

    let (family, members) = h.committed_family(family.id).await;
    assert!(family.head_insuree_id.is_none());
    assert_eq!(members.len(), 1);
    assert!(!members[0].is_head);
}

// ============================================================================
// Membership changes
// ============================================================================

#[tokio::test]
async fn test_add_member_unknown_family_or_insuree() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let ctx = ContextFixtures::clerk();

    let unknown_family = h
        .services
        .household
        .add_family_member(
            &ctx,
            AddFamilyMember {
                family_id: IdFixtures::unknown_family_id(),
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: false,
                replace_head: false,
                start_date: None,
            },
        )
        .await;
    assert_error_code(&unknown_family, ErrorCode::NotFound);

    let unknown_insuree = h
        .services
        .household
        .add_family_member(
            &ctx,
            AddFamilyMember {
                family_id: family.id,
                insuree_id: IdFixtures::unknown_insuree_id(),
                relationship_code: None,
                is_head: false,
                replace_head: false,
                start_date: None,
            },
        )
        .await;
    assert_error_code(&unknown_insuree, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_add_member_already_in_a_family() {
    let h = Harness::new();
    let first = h.family("CONF-1").await;
    let second = h.family("CONF-2").await;
    let insuree = h.member(first.id, HouseholdFixtures::adult("100000001"), false).await;
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .add_family_member(
            &ContextFixtures::clerk(),
            AddFamilyMember {
                family_id: second.id,
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: false,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_add_member_to_inactive_family() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    h.services
        .household
        .delete_family(&ContextFixtures::clerk(), family.id)
        .await
        .unwrap();
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;

    let result = h
        .services
        .household
        .add_family_member(
            &ContextFixtures::clerk(),
            AddFamilyMember {
                family_id: family.id,
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: false,
                replace_head: false,
                start_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_non_head_member_leaves_family_headless() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;

    let membership = h.join(family.id, &insuree, false).await;

    assert!(!membership.is_head);
    let (family, _) = h.committed_family(family.id).await;
    assert!(family.head_insuree_id.is_none());
    assert_eq!(family.member_count, 1);
}

#[tokio::test]
async fn test_transfer_head_promotes_oldest_adult() {
    let h = Harness::new();
    let source = h.family("CONF-1").await;
    let destination = h.family("CONF-2").await;
    let head = h.member(source.id, HouseholdFixtures::adult("100000001"), true).await;
    let younger = h
        .member(
            source.id,
            HouseholdFixtures::born_on("100000002", DateFixtures::adult_dob() + Duration::days(3650)),
            false,
        )
        .await;
    let older = h
        .member(
            source.id,
            HouseholdFixtures::born_on("100000003", DateFixtures::adult_dob() - Duration::days(365)),
            false,
        )
        .await;
    h.member(source.id, HouseholdFixtures::born_on("100000004", DateFixtures::child_dob()), false)
        .await;

    let head_membership = h
        .services
        .household
        .membership_history(&ContextFixtures::clerk(), head.id)
        .await
        .unwrap()
        .remove(0);

    let moved = h
        .services
        .household
        .transfer_family_member(
            &ContextFixtures::clerk(),
            TransferFamilyMember {
                membership_id: head_membership.id,
                new_family_id: destination.id,
                transfer_date: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.family_id, destination.id);
    assert!(!moved.is_head);
    assert!(moved.is_active());

    let (source, _) = h.committed_family(source.id).await;
    assert_eq!(source.head_insuree_id, Some(older.id));
    assert_ne!(source.head_insuree_id, Some(younger.id));
    assert_eq!(source.member_count, 3);

    let (destination, _) = h.committed_family(destination.id).await;
    assert_eq!(destination.member_count, 1);
    assert!(destination.head_insuree_id.is_none());

    let history = h
        .services
        .household
        .membership_history(&ContextFixtures::clerk(), head.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    let ended = history.iter().find(|m| m.id == head_membership.id).unwrap();
    assert_eq!(ended.status, MembershipStatus::Transferred);
    assert_eq!(ended.end_date, Some(DateFixtures::today()));
}

#[tokio::test]
async fn test_transfer_to_same_family() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let membership = h.join(family.id, &insuree, false).await;

    let result = h
        .services
        .household
        .transfer_family_member(
            &ContextFixtures::clerk(),
            TransferFamilyMember {
                membership_id: membership.id,
                new_family_id: family.id,
                transfer_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_transfer_to_unknown_family_writes_nothing() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let membership = h.join(family.id, &insuree, true).await;
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .transfer_family_member(
            &ContextFixtures::clerk(),
            TransferFamilyMember {
                membership_id: membership.id,
                new_family_id: IdFixtures::unknown_family_id(),
                transfer_date: None,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::NotFound);
    assert_eq!(h.snapshot().await, before);
}

// ============================================================================
// Membership dates
// ============================================================================

#[tokio::test]
async fn test_add_member_with_backdated_start_date() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let start = DateFixtures::today() - Duration::days(90);

    let membership = h
        .services
        .household
        .add_family_member(
            &ContextFixtures::clerk(),
            AddFamilyMember {
                family_id: family.id,
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: true,
                replace_head: false,
                start_date: Some(start),
            },
        )
        .await
        .unwrap();

    assert_eq!(membership.start_date, start);
    let stored = h.snapshot().await.memberships.get(&membership.id).cloned().unwrap();
    assert_eq!(stored.start_date, start);
}

#[tokio::test]
async fn test_member_start_date_defaults_to_today() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;

    let membership = h.join(family.id, &insuree, false).await;

    assert_eq!(membership.start_date, DateFixtures::today());
}

#[tokio::test]
async fn test_add_member_future_start_date_rejected() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .add_family_member(
            &ContextFixtures::clerk(),
            AddFamilyMember {
                family_id: family.id,
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: false,
                replace_head: false,
                start_date: Some(DateFixtures::today() + Duration::days(1)),
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert_error_field(&result, "startDate");
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_add_member_start_before_birth_rejected() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let child = h
        .loner(HouseholdFixtures::born_on("100000001", DateFixtures::child_dob()))
        .await;
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .add_family_member(
            &ContextFixtures::clerk(),
            AddFamilyMember {
                family_id: family.id,
                insuree_id: child.id,
                relationship_code: Some(ReferenceFixtures::son().to_string()),
                is_head: false,
                replace_head: false,
                start_date: Some(DateFixtures::child_dob() - Duration::days(1)),
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert_error_field(&result, "startDate");
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_create_insuree_with_start_date() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let ctx = ContextFixtures::clerk();
    let start = DateFixtures::today() - Duration::days(400);

    let insuree = h
        .services
        .household
        .create_insuree(
            &ctx,
            CreateInsuree {
                details: HouseholdFixtures::adult("100000001"),
                family_id: Some(family.id),
                is_head: true,
                relationship_code: None,
                replace_head: false,
                start_date: Some(start),
            },
        )
        .await
        .unwrap();

    let history = h.services.household.membership_history(&ctx, insuree.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].start_date, start);
    h.committed_family(family.id).await;
}

#[tokio::test]
async fn test_create_insuree_start_date_rules() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let ctx = ContextFixtures::clerk();
    let cases = [
        (None, Some(DateFixtures::today() - Duration::days(1)), "familyId"),
        (Some(family.id), Some(DateFixtures::today() + Duration::days(1)), "startDate"),
        (Some(family.id), Some(DateFixtures::adult_dob() - Duration::days(1)), "startDate"),
    ];

    for (family_id, start_date, field) in cases {
        let result = h
            .services
            .household
            .create_insuree(
                &ctx,
                CreateInsuree {
                    details: HouseholdFixtures::adult("100000001"),
                    family_id,
                    is_head: false,
                    relationship_code: None,
                    replace_head: false,
                    start_date,
                },
            )
            .await;

        assert_error_code(&result, ErrorCode::ValidationError);
        assert_error_field(&result, field);
    }
    assert!(h.snapshot().await.insurees.is_empty());
}

#[tokio::test]
async fn test_transfer_on_given_date() {
    let h = Harness::new();
    let source = h.family("CONF-1").await;
    let destination = h.family("CONF-2").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let ctx = ContextFixtures::clerk();
    let membership = h
        .services
        .household
        .add_family_member(
            &ctx,
            AddFamilyMember {
                family_id: source.id,
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: false,
                replace_head: false,
                start_date: Some(DateFixtures::today() - Duration::days(200)),
            },
        )
        .await
        .unwrap();
    let transfer_date = DateFixtures::today() - Duration::days(20);

    let moved = h
        .services
        .household
        .transfer_family_member(
            &ctx,
            TransferFamilyMember {
                membership_id: membership.id,
                new_family_id: destination.id,
                transfer_date: Some(transfer_date),
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.start_date, transfer_date);
    let history = h.services.household.membership_history(&ctx, insuree.id).await.unwrap();
    let ended = history.iter().find(|m| m.id == membership.id).unwrap();
    assert_eq!(ended.status, MembershipStatus::Transferred);
    assert_eq!(ended.end_date, Some(transfer_date));
}

#[tokio::test]
async fn test_transfer_date_rules() {
    let h = Harness::new();
    let source = h.family("CONF-1").await;
    let destination = h.family("CONF-2").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let ctx = ContextFixtures::clerk();
    let membership = h
        .services
        .household
        .add_family_member(
            &ctx,
            AddFamilyMember {
                family_id: source.id,
                insuree_id: insuree.id,
                relationship_code: None,
                is_head: true,
                replace_head: false,
                start_date: Some(DateFixtures::today() - Duration::days(30)),
            },
        )
        .await
        .unwrap();
    let before = h.snapshot().await;

    for transfer_date in [
        DateFixtures::today() + Duration::days(1),
        DateFixtures::today() - Duration::days(31),
        DateFixtures::adult_dob() - Duration::days(1),
    ] {
        let result = h
            .services
            .household
            .transfer_family_member(
                &ctx,
                TransferFamilyMember {
                    membership_id: membership.id,
                    new_family_id: destination.id,
                    transfer_date: Some(transfer_date),
                },
            )
            .await;

        assert_error_code(&result, ErrorCode::ValidationError);
        assert_error_field(&result, "transferDate");
    }
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_remove_head_promotes_oldest_child_without_adults() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let older_child = h
        .member(family.id, HouseholdFixtures::born_on("100000002", DateFixtures::child_dob()), false)
        .await;
    h.member(
        family.id,
        HouseholdFixtures::born_on("100000003", DateFixtures::child_dob() + Duration::days(700)),
        false,
    )
    .await;

    let head_membership = h
        .services
        .household
        .membership_history(&ContextFixtures::clerk(), head.id)
        .await
        .unwrap()
        .remove(0);
    let ended = h
        .services
        .household
        .remove_family_member(
            &ContextFixtures::clerk(),
            RemoveFamilyMember {
                membership_id: head_membership.id,
                reason: Some("moved abroad".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(ended.status, MembershipStatus::Inactive);
    let (family, _) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(older_child.id));
    assert_eq!(family.member_count, 2);
}

#[tokio::test]
async fn test_remove_ended_membership() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let membership = h.join(family.id, &insuree, false).await;
    let input = RemoveFamilyMember {
        membership_id: membership.id,
        reason: None,
    };
    h.services
        .household
        .remove_family_member(&ContextFixtures::clerk(), input.clone())
        .await
        .unwrap();

    let again = h
        .services
        .household
        .remove_family_member(&ContextFixtures::clerk(), input)
        .await;

    assert_error_code(&again, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_removing_last_member_empties_family() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;
    let membership = h.join(family.id, &insuree, true).await;

    h.services
        .household
        .remove_family_member(
            &ContextFixtures::clerk(),
            RemoveFamilyMember {
                membership_id: membership.id,
                reason: None,
            },
        )
        .await
        .unwrap();

    let (family, members) = h.committed_family(family.id).await;
    assert!(members.is_empty());
    assert!(family.head_insuree_id.is_none());
    assert!(family.is_active);
}

// ============================================================================
// Deletion and status
// ============================================================================

#[tokio::test]
async fn test_delete_family_ends_memberships() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    h.member(family.id, HouseholdFixtures::adult("100000002"), false).await;

    let deleted = h
        .services
        .household
        .delete_family(&ContextFixtures::clerk(), family.id)
        .await
        .unwrap();

    assert!(!deleted.is_active);
    assert!(deleted.head_insuree_id.is_none());
    assert_eq!(deleted.member_count, 0);

    let state = h.snapshot().await;
    let ended: Vec<_> = state
        .memberships
        .values()
        .filter(|m| m.family_id == family.id)
        .collect();
    assert_eq!(ended.len(), 2);
    assert!(ended.iter().all(|m| m.status == MembershipStatus::Inactive && !m.is_head));
    h.committed_family(family.id).await;
}

#[tokio::test]
async fn test_delete_family_with_live_policy() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    h.services
        .coverage
        .create_policy(
            &ContextFixtures::clerk(),
            app_services::NewPolicy {
                family_id: family.id,
                product_code: "BASIC".to_string(),
                dates: PolicyDatesBuilder::new().build(),
                value: test_utils::AmountFixtures::policy_value(),
            },
        )
        .await
        .unwrap();
    let before = h.snapshot().await;

    let result = h
        .services
        .household
        .delete_family(&ContextFixtures::clerk(), family.id)
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_deceased_head_is_succeeded() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;
    let spouse = h.member(family.id, HouseholdFixtures::adult("100000002"), false).await;
    let ctx = ContextFixtures::clerk();

    let insuree = h
        .services
        .household
        .change_insuree_status(
            &ctx,
            ChangeInsureeStatus {
                insuree_id: head.id,
                status: InsureeStatus::Deceased,
            },
        )
        .await
        .unwrap();
    assert_eq!(insuree.status, InsureeStatus::Deceased);

    let (family, _) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(spouse.id));
    assert_eq!(family.member_count, 1);

    let history = h.services.household.membership_history(&ctx, head.id).await.unwrap();
    assert_eq!(history[0].status, MembershipStatus::Deceased);

    let revived = h
        .services
        .household
        .change_insuree_status(
            &ctx,
            ChangeInsureeStatus {
                insuree_id: head.id,
                status: InsureeStatus::Active,
            },
        )
        .await;
    assert_error_code(&revived, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_suspended_insuree_keeps_membership() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let head = h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;

    h.services
        .household
        .change_insuree_status(
            &ContextFixtures::clerk(),
            ChangeInsureeStatus {
                insuree_id: head.id,
                status: InsureeStatus::Suspended,
            },
        )
        .await
        .unwrap();

    let (family, _) = h.committed_family(family.id).await;
    assert_eq!(family.head_insuree_id, Some(head.id));
}

#[tokio::test]
async fn test_same_status_is_invalid() {
    let h = Harness::new();
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;

    let result = h
        .services
        .household
        .change_insuree_status(
            &ContextFixtures::clerk(),
            ChangeInsureeStatus {
                insuree_id: insuree.id,
                status: InsureeStatus::Active,
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_delete_insuree_ends_membership() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let insuree = h.member(family.id, HouseholdFixtures::adult("100000001"), false).await;

    let deleted = h
        .services
        .household
        .delete_insuree(&ContextFixtures::clerk(), insuree.id)
        .await
        .unwrap();

    assert_eq!(deleted.status, InsureeStatus::Inactive);
    let (family, members) = h.committed_family(family.id).await;
    assert!(members.is_empty());
    assert_eq!(family.member_count, 0);
}

// ============================================================================
// Updates
// ============================================================================

#[tokio::test]
async fn test_update_insuree_without_changes() {
    let h = Harness::new();
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;

    let result = h
        .services
        .household
        .update_insuree(
            &ContextFixtures::clerk(),
            UpdateInsuree {
                insuree_id: insuree.id,
                changes: InsureeChanges::default(),
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_update_insuree_chf_id_taken() {
    let h = Harness::new();
    h.loner(HouseholdFixtures::adult("100000001")).await;
    let other = h.loner(HouseholdFixtures::adult("100000002")).await;

    let result = h
        .services
        .household
        .update_insuree(
            &ContextFixtures::clerk(),
            UpdateInsuree {
                insuree_id: other.id,
                changes: InsureeChanges {
                    chf_id: Some("100000001".to_string()),
                    ..InsureeChanges::default()
                },
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::DuplicateEntry);
}

#[tokio::test]
async fn test_update_insuree_bumps_version() {
    let h = Harness::new();
    let insuree = h.loner(HouseholdFixtures::adult("100000001")).await;

    let updated = h
        .services
        .household
        .update_insuree(
            &ContextFixtures::clerk(),
            UpdateInsuree {
                insuree_id: insuree.id,
                changes: InsureeChanges {
                    phone: Some("+255700000009".to_string()),
                    ..InsureeChanges::default()
                },
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.phone.as_deref(), Some("+255700000009"));
    assert_eq!(updated.last_name, insuree.last_name);
    assert!(updated.audit.version > insuree.audit.version);
}

#[tokio::test]
async fn test_update_family_poverty_flag() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;

    let updated = h
        .services
        .household
        .update_family(
            &ContextFixtures::clerk(),
            app_services::UpdateFamily {
                family_id: family.id,
                changes: FamilyChanges {
                    poverty: Some(true),
                    ..FamilyChanges::default()
                },
            },
        )
        .await
        .unwrap();

    assert!(updated.poverty);
    assert_eq!(updated.confirmation_no, family.confirmation_no);
}

// ============================================================================
// Authorization and audit
// ============================================================================

#[tokio::test]
async fn test_denied_context_writes_nothing() {
    let h = Harness::new();

    let result = h
        .services
        .household
        .create_family(&ContextFixtures::denied(), HouseholdFixtures::family("CONF-1"))
        .await;

    assert_error_code(&result, ErrorCode::PermissionDenied);
    assert_eq!(h.snapshot().await, Default::default());
}

#[tokio::test]
async fn test_mutations_are_audited_with_correlation_id() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    h.member(family.id, HouseholdFixtures::adult("100000001"), true).await;

    let audit = h.snapshot().await.audit_log;
    assert!(audit.iter().any(|e| e.action == "createFamily"));
    assert!(audit.iter().any(|e| e.action == "createInsuree"));
    assert!(audit
        .iter()
        .all(|e| e.correlation_id.as_deref() == Some("test-correlation")));
    assert!(audit.iter().all(|e| e.actor == "enrolment-officer"));
}
