//! Shared setup for service tests

#![allow(dead_code)]

use std::sync::Arc;

use app_services::{
    AddFamilyMember, CreateInsuree, InMemoryStore, MemoryState, ServiceConfig, Services,
};
use core_kernel::{FamilyId, FixedClock};
use domain_household::{Family, FamilyMembership, Insuree, InsureeDetails};
use test_utils::{assert_head_invariant, ContextFixtures, DateFixtures, HouseholdFixtures, ReferenceFixtures};

/// Services over a fresh in-memory store
pub struct Harness {
    pub store: InMemoryStore,
    pub clock: Arc<FixedClock>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let store = InMemoryStore::new();
        let clock = DateFixtures::clock();
        let services = Services::new(
            Arc::new(store.clone()),
            ReferenceFixtures::builtin(),
            config,
            clock.clone(),
        );
        Self {
            store,
            clock,
            services,
        }
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.store.snapshot().await
    }

    pub async fn family(&self, confirmation_no: &str) -> Family {
        self.services
            .household
            .create_family(&ContextFixtures::clerk(), HouseholdFixtures::family(confirmation_no))
            .await
            .unwrap()
    }

    /// Registers an insuree without a family
    pub async fn loner(&self, details: InsureeDetails) -> Insuree {
        self.services
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
            .await
            .unwrap()
    }

    /// Registers an insuree straight into a family
    pub async fn member(&self, family_id: FamilyId, details: InsureeDetails, is_head: bool) -> Insuree {
        self.services
            .household
            .create_insuree(
                &ContextFixtures::clerk(),
                CreateInsuree {
                    details,
                    family_id: Some(family_id),
                    is_head,
                    relationship_code: None,
                    replace_head: false,
                    start_date: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn join(&self, family_id: FamilyId, insuree: &Insuree, is_head: bool) -> FamilyMembership {
        self.services
            .household
            .add_family_member(
                &ContextFixtures::clerk(),
                AddFamilyMember {
                    family_id,
                    insuree_id: insuree.id,
                    relationship_code: None,
                    is_head,
                    replace_head: false,
                    start_date: None,
                },
            )
            .await
            .unwrap()
    }

    /// Committed family with its active memberships, checked against the head invariant
    pub async fn committed_family(&self, family_id: FamilyId) -> (Family, Vec<FamilyMembership>) {
        let state = self.snapshot().await;
        let family = state.families.get(&family_id).cloned().unwrap();
        let members: Vec<FamilyMembership> = state
            .memberships
            .values()
            .filter(|m| m.family_id == family_id && m.is_active())
            .cloned()
            .collect();
        assert_head_invariant(&family, &members);
        (family, members)
    }
}
