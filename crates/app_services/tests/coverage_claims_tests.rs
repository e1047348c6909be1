//! Coverage and claims service tests over the in-memory store

mod common;

use chrono::{Duration, NaiveDate};
use rust_decimal_macros::dec;

use app_services::{NewPolicy, ProcessClaim, RenewPolicy, SuspendPolicy};
use common::Harness;
use core_kernel::{ErrorCode, FamilyId, InsureeId};
use domain_claims::{ClaimAmounts, ClaimStatus};
use domain_household::InsureeStatus;
use domain_policy::{PolicyDates, PolicyStatus};
use test_utils::{
    assert_error_code, assert_error_field, assert_valid_claim_path, AmountFixtures,
    ContextFixtures, DateFixtures, HouseholdFixtures, IdFixtures, NewClaimBuilder,
    PolicyDatesBuilder, ReferenceFixtures,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_policy(family_id: FamilyId, dates: PolicyDates) -> NewPolicy {
    NewPolicy {
        family_id,
        product_code: "BASIC".to_string(),
        dates,
        value: AmountFixtures::policy_value(),
    }
}

fn step(claim_id: core_kernel::ClaimId, target: ClaimStatus, amounts: ClaimAmounts) -> ProcessClaim {
    ProcessClaim {
        claim_id,
        target_status: target,
        amounts,
        reason: None,
    }
}

async fn insured(h: &Harness) -> InsureeId {
    let family = h.family("CONF-1").await;
    h.member(family.id, HouseholdFixtures::adult("100000001"), true)
        .await
        .id
}

// ============================================================================
// Policies
// ============================================================================

#[tokio::test]
async fn test_create_policy_active_today() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;

    let view = h
        .services
        .coverage
        .create_policy(&ContextFixtures::clerk(), new_policy(family.id, PolicyDatesBuilder::new().build()))
        .await
        .unwrap();

    assert_eq!(view.status, PolicyStatus::Active);
    assert_eq!(view.policy.family_id, family.id);
    assert_eq!(view.policy.renewal_count, 0);
}

#[tokio::test]
async fn test_create_policy_effective_not_before_expiry() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let dates = PolicyDatesBuilder::new()
        .starting(date(2024, 3, 1))
        .expiring(date(2024, 3, 1))
        .build();

    let result = h
        .services
        .coverage
        .create_policy(&ContextFixtures::clerk(), new_policy(family.id, dates))
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert!(h.snapshot().await.policies.is_empty());
}

#[tokio::test]
async fn test_create_policy_future_window_is_inactive() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let dates = PolicyDatesBuilder::new()
        .starting(date(2024, 7, 1))
        .expiring(date(2025, 6, 30))
        .build();

    let view = h
        .services
        .coverage
        .create_policy(&ContextFixtures::clerk(), new_policy(family.id, dates))
        .await
        .unwrap();

    assert_eq!(view.status, PolicyStatus::Inactive);
}

#[tokio::test]
async fn test_create_policy_unknown_or_inactive_family() {
    let h = Harness::new();
    let ctx = ContextFixtures::clerk();

    let unknown = h
        .services
        .coverage
        .create_policy(&ctx, new_policy(IdFixtures::unknown_family_id(), PolicyDatesBuilder::new().build()))
        .await;
    assert_error_code(&unknown, ErrorCode::NotFound);

    let family = h.family("CONF-1").await;
    h.services.household.delete_family(&ctx, family.id).await.unwrap();
    let inactive = h
        .services
        .coverage
        .create_policy(&ctx, new_policy(family.id, PolicyDatesBuilder::new().build()))
        .await;
    assert_error_code(&inactive, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_expiry_date_is_covered() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let dates = PolicyDatesBuilder::new()
        .starting(date(2023, 6, 15))
        .expiring(DateFixtures::today())
        .build();

    let view = h
        .services
        .coverage
        .create_policy(&ContextFixtures::clerk(), new_policy(family.id, dates))
        .await
        .unwrap();

    assert_eq!(view.status, PolicyStatus::Active);
    h.clock.advance_days(1);
    let later = h
        .services
        .coverage
        .get_policy(&ContextFixtures::clerk(), view.policy.id)
        .await
        .unwrap();
    assert_eq!(later.status, PolicyStatus::Expired);
}

#[tokio::test]
async fn test_renew_expired_policy_keeps_id() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let dates = PolicyDatesBuilder::new()
        .starting(date(2023, 1, 1))
        .expiring(date(2023, 12, 31))
        .build();
    let ctx = ContextFixtures::clerk();
    let view = h
        .services
        .coverage
        .create_policy(&ctx, new_policy(family.id, dates))
        .await
        .unwrap();
    assert_eq!(view.status, PolicyStatus::Expired);

    let renewed = h
        .services
        .coverage
        .renew_policy(
            &ctx,
            RenewPolicy {
                policy_id: view.policy.id,
                new_effective_date: date(2024, 1, 1),
                new_expiry_date: date(2024, 12, 31),
            },
        )
        .await
        .unwrap();

    assert_eq!(renewed.policy.id, view.policy.id);
    assert_eq!(renewed.policy.enroll_date, date(2023, 1, 1));
    assert_eq!(renewed.policy.renewal_count, 1);
    assert_eq!(renewed.status, PolicyStatus::Active);
}

#[tokio::test]
async fn test_renew_must_extend_coverage() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let ctx = ContextFixtures::clerk();
    let view = h
        .services
        .coverage
        .create_policy(&ctx, new_policy(family.id, PolicyDatesBuilder::new().build()))
        .await
        .unwrap();

    let result = h
        .services
        .coverage
        .renew_policy(
            &ctx,
            RenewPolicy {
                policy_id: view.policy.id,
                new_effective_date: date(2024, 1, 1),
                new_expiry_date: date(2024, 12, 31),
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
    assert_error_field(&result, "expiryDate");
}

#[tokio::test]
async fn test_renew_inactive_policy_is_invalid() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let ctx = ContextFixtures::clerk();
    let dates = PolicyDatesBuilder::new()
        .starting(date(2024, 9, 1))
        .expiring(date(2025, 8, 31))
        .build();
    let view = h
        .services
        .coverage
        .create_policy(&ctx, new_policy(family.id, dates))
        .await
        .unwrap();

    let result = h
        .services
        .coverage
        .renew_policy(
            &ctx,
            RenewPolicy {
                policy_id: view.policy.id,
                new_effective_date: date(2024, 9, 1),
                new_expiry_date: date(2026, 8, 31),
            },
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_suspend_and_reinstate() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let ctx = ContextFixtures::clerk();
    let view = h
        .services
        .coverage
        .create_policy(&ctx, new_policy(family.id, PolicyDatesBuilder::new().build()))
        .await
        .unwrap();

    let blank = h
        .services
        .coverage
        .suspend_policy(
            &ctx,
            SuspendPolicy {
                policy_id: view.policy.id,
                reason: "  ".to_string(),
            },
        )
        .await;
    assert_error_field(&blank, "reason");

    let suspended = h
        .services
        .coverage
        .suspend_policy(
            &ctx,
            SuspendPolicy {
                policy_id: view.policy.id,
                reason: "premium unpaid".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(suspended.status, PolicyStatus::Suspended);
    assert_eq!(suspended.policy.suspension_reason.as_deref(), Some("premium unpaid"));

    let twice = h
        .services
        .coverage
        .suspend_policy(
            &ctx,
            SuspendPolicy {
                policy_id: view.policy.id,
                reason: "again".to_string(),
            },
        )
        .await;
    assert_error_code(&twice, ErrorCode::InvalidState);

    let reinstated = h
        .services
        .coverage
        .reinstate_policy(&ctx, view.policy.id)
        .await
        .unwrap();
    assert_eq!(reinstated.status, PolicyStatus::Active);

    let not_suspended = h.services.coverage.reinstate_policy(&ctx, view.policy.id).await;
    assert_error_code(&not_suspended, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_family_policies_oldest_first() {
    let h = Harness::new();
    let family = h.family("CONF-1").await;
    let ctx = ContextFixtures::clerk();
    let later = PolicyDatesBuilder::new()
        .starting(date(2024, 2, 1))
        .expiring(date(2025, 1, 31))
        .build();
    h.services
        .coverage
        .create_policy(&ctx, new_policy(family.id, later))
        .await
        .unwrap();
    h.services
        .coverage
        .create_policy(&ctx, new_policy(family.id, PolicyDatesBuilder::new().build()))
        .await
        .unwrap();

    let policies = h.services.coverage.family_policies(&ctx, family.id).await.unwrap();

    assert_eq!(policies.len(), 2);
    assert_eq!(policies[0].policy.enroll_date, date(2024, 1, 1));

    let missing = h
        .services
        .coverage
        .family_policies(&ctx, IdFixtures::unknown_family_id())
        .await;
    assert_error_code(&missing, ErrorCode::NotFound);
}

// ============================================================================
// Claims
// ============================================================================

#[tokio::test]
async fn test_submit_claim_entered_with_code() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;

    let claim = h
        .services
        .claims
        .submit_claim(&ContextFixtures::clerk(), NewClaimBuilder::new(insuree_id).build())
        .await
        .unwrap();

    assert_eq!(claim.status, ClaimStatus::Entered);
    assert!(claim.code.starts_with("CLM-2024-"));
    assert_eq!(claim.claimed, AmountFixtures::claimed());
}

#[tokio::test]
async fn test_submit_claim_visit_after_claim_date() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;
    let claim = NewClaimBuilder::new(insuree_id)
        .visit_date(DateFixtures::today() + Duration::days(1))
        .build();

    let result = h
        .services
        .claims
        .submit_claim(&ContextFixtures::clerk(), claim)
        .await;

    assert_error_code(&result, ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_submit_claim_non_positive_amount() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;

    let result = h
        .services
        .claims
        .submit_claim(
            &ContextFixtures::clerk(),
            NewClaimBuilder::new(insuree_id).claimed(dec!(0)).build(),
        )
        .await;

    assert_error_field(&result, "claimed");
}

#[tokio::test]
async fn test_submit_claim_inactive_facility() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;
    let claim = NewClaimBuilder::new(insuree_id)
        .facility(ReferenceFixtures::inactive_facility())
        .build();

    let result = h
        .services
        .claims
        .submit_claim(&ContextFixtures::clerk(), claim)
        .await;

    assert_error_code(&result, ErrorCode::NotFound);
    assert!(h.snapshot().await.claims.is_empty());
}

#[tokio::test]
async fn test_submit_claim_unknown_or_inactive_insuree() {
    let h = Harness::new();
    let ctx = ContextFixtures::clerk();

    let unknown = h
        .services
        .claims
        .submit_claim(&ctx, NewClaimBuilder::new(IdFixtures::unknown_insuree_id()).build())
        .await;
    assert_error_code(&unknown, ErrorCode::NotFound);

    let insuree = h.loner(HouseholdFixtures::adult("100000009")).await;
    h.services
        .household
        .change_insuree_status(
            &ctx,
            app_services::ChangeInsureeStatus {
                insuree_id: insuree.id,
                status: InsureeStatus::Suspended,
            },
        )
        .await
        .unwrap();
    let suspended = h
        .services
        .claims
        .submit_claim(&ctx, NewClaimBuilder::new(insuree.id).build())
        .await;
    assert_error_code(&suspended, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_claim_cannot_skip_to_valuated() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;
    let ctx = ContextFixtures::clerk();
    let claim = h
        .services
        .claims
        .submit_claim(&ctx, NewClaimBuilder::new(insuree_id).build())
        .await
        .unwrap();
    let before = h.snapshot().await;

    let result = h
        .services
        .claims
        .process_claim(
            &ctx,
            step(
                claim.id,
                ClaimStatus::Valuated,
                ClaimAmounts {
                    valuated: Some(dec!(200.00)),
                    ..ClaimAmounts::default()
                },
            ),
        )
        .await;

    assert_error_code(&result, ErrorCode::InvalidState);
    assert_eq!(h.snapshot().await, before);
}

#[tokio::test]
async fn test_claim_full_path_recorded_in_history() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;
    let ctx = ContextFixtures::clerk();
    let claim = h
        .services
        .claims
        .submit_claim(&ctx, NewClaimBuilder::new(insuree_id).build())
        .await
        .unwrap();

    h.services
        .claims
        .process_claim(&ctx, step(claim.id, ClaimStatus::Checked, ClaimAmounts::default()))
        .await
        .unwrap();
    h.services
        .claims
        .process_claim(
            &ctx,
            step(
                claim.id,
                ClaimStatus::Processed,
                ClaimAmounts {
                    approved: Some(dec!(240.00)),
                    ..ClaimAmounts::default()
                },
            ),
        )
        .await
        .unwrap();

    let over_reimbursed = h
        .services
        .claims
        .process_claim(
            &ctx,
            step(
                claim.id,
                ClaimStatus::Valuated,
                ClaimAmounts {
                    valuated: Some(dec!(200.00)),
                    reimbursed: Some(dec!(210.00)),
                    ..ClaimAmounts::default()
                },
            ),
        )
        .await;
    assert_error_field(&over_reimbursed, "reimbursed");

    let valuated = h
        .services
        .claims
        .process_claim(
            &ctx,
            step(
                claim.id,
                ClaimStatus::Valuated,
                ClaimAmounts {
                    valuated: Some(dec!(200.00)),
                    reimbursed: Some(dec!(200.00)),
                    ..ClaimAmounts::default()
                },
            ),
        )
        .await
        .unwrap();
    assert_eq!(valuated.status, ClaimStatus::Valuated);
    assert_eq!(valuated.approved, Some(dec!(240.00)));

    let history = h.services.claims.claim_history(&ctx, claim.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_valid_claim_path(&history);
    assert_eq!(history[2].to_status, ClaimStatus::Valuated);
    assert!(history.iter().all(|c| c.changed_by == "enrolment-officer"));

    let terminal = h
        .services
        .claims
        .process_claim(&ctx, step(claim.id, ClaimStatus::Rejected, ClaimAmounts::default()))
        .await;
    assert_error_code(&terminal, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;
    let ctx = ContextFixtures::clerk();
    let claim = h
        .services
        .claims
        .submit_claim(&ctx, NewClaimBuilder::new(insuree_id).build())
        .await
        .unwrap();

    let missing = h
        .services
        .claims
        .process_claim(&ctx, step(claim.id, ClaimStatus::Rejected, ClaimAmounts::default()))
        .await;
    assert_error_field(&missing, "reason");

    let rejected = h
        .services
        .claims
        .process_claim(
            &ctx,
            ProcessClaim {
                reason: Some("not covered".to_string()),
                ..step(claim.id, ClaimStatus::Rejected, ClaimAmounts::default())
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, ClaimStatus::Rejected);
    assert_eq!(rejected.rejected, Some(AmountFixtures::claimed()));
    assert_eq!(rejected.rejection_reason.as_deref(), Some("not covered"));
}

#[tokio::test]
async fn test_insuree_claims_and_missing_parents() {
    let h = Harness::new();
    let insuree_id = insured(&h).await;
    let ctx = ContextFixtures::clerk();
    for _ in 0..2 {
        h.services
            .claims
            .submit_claim(&ctx, NewClaimBuilder::new(insuree_id).build())
            .await
            .unwrap();
    }

    let claims = h.services.claims.insuree_claims(&ctx, insuree_id).await.unwrap();
    assert_eq!(claims.len(), 2);
    assert_ne!(claims[0].code, claims[1].code);

    let unknown = h
        .services
        .claims
        .insuree_claims(&ctx, IdFixtures::unknown_insuree_id())
        .await;
    assert_error_code(&unknown, ErrorCode::NotFound);
}
