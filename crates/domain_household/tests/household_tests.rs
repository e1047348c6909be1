//! Property tests for head-of-family rules

use chrono::{Duration, NaiveDate, Utc};
use proptest::prelude::*;

use core_kernel::Actor;
use domain_household::{
    select_successor, Family, FamilyDetails, FamilyMembership, Insuree, InsureeDetails,
    SuccessionCandidate,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn insuree(index: usize, dob: NaiveDate) -> Insuree {
    Insuree::register(
        InsureeDetails {
            chf_id: format!("{:08}", index),
            last_name: "Member".to_string(),
            other_names: format!("No{}", index),
            gender_code: "F".to_string(),
            dob,
            marital_status: None,
            phone: None,
            email: None,
            current_address: None,
            profession_code: None,
            location_code: None,
        },
        &Actor::system(),
        Utc::now(),
    )
}

proptest! {
    #[test]
    fn prop_successor_is_oldest_adult_or_oldest_member(
        ages_in_days in prop::collection::vec(0i64..(90 * 365), 1..8)
    ) {
        let family = Family::create(FamilyDetails::default(), &Actor::system(), Utc::now());
        let insurees: Vec<Insuree> = ages_in_days
            .iter()
            .enumerate()
            .map(|(i, days)| insuree(i, today() - Duration::days(*days)))
            .collect();
        let memberships: Vec<FamilyMembership> = insurees
            .iter()
            .map(|i| FamilyMembership::start(family.id, i.id, None, false, today(), &Actor::system(), Utc::now()))
            .collect();
        let candidates: Vec<SuccessionCandidate<'_>> = memberships
            .iter()
            .zip(insurees.iter())
            .map(|(membership, insuree)| SuccessionCandidate { membership, insuree })
            .collect();

        let chosen = select_successor(&candidates, today(), 18).unwrap();
        let winner = candidates.iter().find(|c| c.membership.id == chosen).unwrap();

        let any_adult = insurees.iter().any(|i| i.is_adult_on(today(), 18));
        if any_adult {
            prop_assert!(winner.insuree.is_adult_on(today(), 18));
        }
        let oldest_dob = insurees.iter().map(|i| i.dob).min().unwrap();
        prop_assert_eq!(winner.insuree.dob, oldest_dob);
    }
}
