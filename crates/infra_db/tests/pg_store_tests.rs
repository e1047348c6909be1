//! PostgreSQL store tests
//!
//! These start a PostgreSQL container and need Docker:
//! `cargo test -p infra_db -- --ignored`

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use app_services::{
    CreateInsuree, NewPolicy, ServiceConfig, Services, Store, TransferFamilyMember,
};
use core_kernel::{Actor, ErrorCode, HealthCheckable, AdapterHealth, PortError};
use domain_claims::ClaimStatus;
use domain_household::{Family, FamilyMembership, Insuree};
use infra_db::PgStore;
use test_utils::{
    ContextFixtures, DateFixtures, HouseholdFixtures, NewClaimBuilder, PolicyDatesBuilder,
    ReferenceFixtures, TestDatabase,
};

fn store(db: &TestDatabase) -> PgStore {
    PgStore::new(db.pool().clone(), Duration::from_millis(500))
}

fn services(store: PgStore) -> Services {
    Services::new(
        Arc::new(store),
        ReferenceFixtures::builtin(),
        ServiceConfig::default(),
        DateFixtures::clock(),
    )
}

fn clerk() -> Actor {
    Actor::new("enrolment-officer")
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_health_check_reports_healthy() {
    let db = TestDatabase::start().await.unwrap();

    let health = store(&db).health_check().await;

    assert_eq!(health.adapter_id, "postgres-store");
    assert_eq!(health.status, AdapterHealth::Healthy);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_commit_persists_and_rollback_discards() {
    let db = TestDatabase::start().await.unwrap();
    let store = store(&db);
    let now = chrono::Utc::now();

    let kept = Family::create(HouseholdFixtures::family("CONF-1"), &clerk(), now);
    let mut uow = store.begin().await.unwrap();
    uow.save_family(&kept).await.unwrap();
    uow.commit().await.unwrap();

    let discarded = Family::create(HouseholdFixtures::family("CONF-2"), &clerk(), now);
    let mut uow = store.begin().await.unwrap();
    uow.save_family(&discarded).await.unwrap();
    uow.rollback().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let loaded = uow.family(kept.id).await.unwrap().unwrap();
    assert_eq!(loaded.confirmation_no.as_deref(), Some("CONF-1"));
    assert_eq!(loaded.audit.version, kept.audit.version);
    assert!(uow.family(discarded.id).await.unwrap().is_none());
    assert_eq!(db.row_count("families").await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_duplicate_chf_id_maps_to_duplicate() {
    let db = TestDatabase::start().await.unwrap();
    let store = store(&db);
    let now = chrono::Utc::now();

    let first = Insuree::register(HouseholdFixtures::adult("100000001"), &clerk(), now);
    let second = Insuree::register(HouseholdFixtures::adult("100000001"), &clerk(), now);
    let mut uow = store.begin().await.unwrap();
    uow.save_insuree(&first).await.unwrap();

    let error = uow.save_insuree(&second).await.unwrap_err();

    match error {
        PortError::Duplicate { field, value } => {
            assert_eq!(field, "chfId");
            assert_eq!(value, "100000001");
        }
        other => panic!("Expected Duplicate, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_second_active_head_maps_to_conflict() {
    let db = TestDatabase::start().await.unwrap();
    let store = store(&db);
    let now = chrono::Utc::now();

    let family = Family::create(HouseholdFixtures::family("CONF-1"), &clerk(), now);
    let first = Insuree::register(HouseholdFixtures::adult("100000001"), &clerk(), now);
    let second = Insuree::register(HouseholdFixtures::adult("100000002"), &clerk(), now);
    let mut uow = store.begin().await.unwrap();
    uow.save_insuree(&first).await.unwrap();
    uow.save_insuree(&second).await.unwrap();
    uow.save_family(&family).await.unwrap();
    uow.save_membership(&FamilyMembership::start(family.id, first.id, None, true, now.date_naive(), &clerk(), now))
        .await
        .unwrap();

    let error = uow
        .save_membership(&FamilyMembership::start(family.id, second.id, None, true, now.date_naive(), &clerk(), now))
        .await
        .unwrap_err();

    assert!(matches!(error, PortError::Conflict { .. }), "{:?}", error);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_household_flow_over_postgres() {
    let db = TestDatabase::start().await.unwrap();
    let services = services(store(&db));
    let ctx = ContextFixtures::clerk();

    let origin = services
        .household
        .create_family(&ctx, HouseholdFixtures::family("CONF-1"))
        .await
        .unwrap();
    let destination = services
        .household
        .create_family(&ctx, HouseholdFixtures::family("CONF-2"))
        .await
        .unwrap();
    let head = services
        .household
        .create_insuree(
            &ctx,
            CreateInsuree {
                details: HouseholdFixtures::adult("100000001"),
                family_id: Some(origin.id),
                is_head: true,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await
        .unwrap();
    let spouse = services
        .household
        .create_insuree(
            &ctx,
            CreateInsuree {
                details: HouseholdFixtures::adult("100000002"),
                family_id: Some(origin.id),
                is_head: false,
                relationship_code: Some(ReferenceFixtures::spouse().to_string()),
                replace_head: false,
                start_date: None,
            },
        )
        .await
        .unwrap();

    let members = services.household.family_members(&ctx, origin.id).await.unwrap();
    let head_membership = members.iter().find(|m| m.insuree_id == head.id).unwrap();
    services
        .household
        .transfer_family_member(
            &ctx,
            TransferFamilyMember {
                membership_id: head_membership.id,
                new_family_id: destination.id,
                transfer_date: None,
            },
        )
        .await
        .unwrap();

    let origin = services.household.get_family(&ctx, origin.id).await.unwrap();
    assert_eq!(origin.head_insuree_id, Some(spouse.id));
    let destination = services.household.get_family(&ctx, destination.id).await.unwrap();
    assert_eq!(destination.member_count, 1);
    let history = services.household.membership_history(&ctx, head.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(db.row_count("audit_log").await.unwrap() >= 5);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_policy_and_claim_over_postgres() {
    let db = TestDatabase::start().await.unwrap();
    let services = services(store(&db));
    let ctx = ContextFixtures::clerk();

    let family = services
        .household
        .create_family(&ctx, HouseholdFixtures::family("CONF-1"))
        .await
        .unwrap();
    let insuree = services
        .household
        .create_insuree(
            &ctx,
            CreateInsuree {
                details: HouseholdFixtures::adult("100000001"),
                family_id: Some(family.id),
                is_head: true,
                relationship_code: None,
                replace_head: false,
                start_date: None,
            },
        )
        .await
        .unwrap();
    services
        .coverage
        .create_policy(
            &ctx,
            NewPolicy {
                family_id: family.id,
                product_code: "BASIC".to_string(),
                dates: PolicyDatesBuilder::new().build(),
                value: dec!(120000.00),
            },
        )
        .await
        .unwrap();

    let claim = services
        .claims
        .submit_claim(&ctx, NewClaimBuilder::new(insuree.id).build())
        .await
        .unwrap();

    assert_eq!(claim.status, ClaimStatus::Entered);
    let stored = services.claims.insuree_claims(&ctx, insuree.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].code, claim.code);
    assert_eq!(stored[0].claimed, claim.claimed);

    let missing = services.household.get_insuree(&ctx, test_utils::IdFixtures::unknown_insuree_id()).await;
    assert_eq!(missing.unwrap_err().code(), ErrorCode::NotFound);
}
