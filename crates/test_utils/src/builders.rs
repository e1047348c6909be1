//! Test Data Builders
//!
//! Builders for domain inputs with sensible defaults, so tests only spell
//! out the fields they care about. Names are randomized with `fake`.

use chrono::NaiveDate;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::InsureeId;
use domain_claims::{NewClaim, VisitType};
use domain_household::InsureeDetails;
use domain_policy::PolicyDates;

use crate::fixtures::{AmountFixtures, DateFixtures, ReferenceFixtures};

/// Builder for [`InsureeDetails`]
pub struct InsureeDetailsBuilder {
    details: InsureeDetails,
}

impl InsureeDetailsBuilder {
    /// Creates a builder for an adult with random names
    pub fn new(chf_id: impl Into<String>) -> Self {
        Self {
            details: InsureeDetails {
                chf_id: chf_id.into(),
                last_name: LastName().fake(),
                other_names: FirstName().fake(),
                gender_code: "M".to_string(),
                dob: DateFixtures::adult_dob(),
                marital_status: None,
                phone: None,
                email: None,
                current_address: None,
                profession_code: None,
                location_code: None,
            },
        }
    }

    pub fn born_on(mut self, dob: NaiveDate) -> Self {
        self.details.dob = dob;
        self
    }

    pub fn gender(mut self, code: impl Into<String>) -> Self {
        self.details.gender_code = code.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.details.email = Some(email.into());
        self
    }

    pub fn location(mut self, code: impl Into<String>) -> Self {
        self.details.location_code = Some(code.into());
        self
    }

    pub fn build(self) -> InsureeDetails {
        self.details
    }
}

/// Builder for [`PolicyDates`]
pub struct PolicyDatesBuilder {
    dates: PolicyDates,
}

impl Default for PolicyDatesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyDatesBuilder {
    /// A window covering the fixture policy year
    pub fn new() -> Self {
        let (start, end) = DateFixtures::policy_year();
        Self {
            dates: PolicyDates {
                enroll_date: start,
                start_date: start,
                effective_date: start,
                expiry_date: end,
            },
        }
    }

    /// Enroll, start and effective dates all on `date`
    pub fn starting(mut self, date: NaiveDate) -> Self {
        self.dates.enroll_date = date;
        self.dates.start_date = date;
        self.dates.effective_date = date;
        self
    }

    pub fn effective(mut self, date: NaiveDate) -> Self {
        self.dates.effective_date = date;
        self
    }

    pub fn expiring(mut self, date: NaiveDate) -> Self {
        self.dates.expiry_date = date;
        self
    }

    pub fn build(self) -> PolicyDates {
        self.dates
    }
}

/// Builder for [`NewClaim`]
pub struct NewClaimBuilder {
    claim: NewClaim,
}

impl NewClaimBuilder {
    /// A routine visit two days before a claim dated today
    pub fn new(insuree_id: InsureeId) -> Self {
        let today = DateFixtures::today();
        Self {
            claim: NewClaim {
                insuree_id,
                facility_code: ReferenceFixtures::active_facility().to_string(),
                claim_date: today,
                visit_date: today - chrono::Duration::days(2),
                visit_type: VisitType::Routine,
                claimed: AmountFixtures::claimed(),
                diagnosis: None,
                explanation: None,
            },
        }
    }

    pub fn facility(mut self, code: impl Into<String>) -> Self {
        self.claim.facility_code = code.into();
        self
    }

    pub fn visit_date(mut self, date: NaiveDate) -> Self {
        self.claim.visit_date = date;
        self
    }

    pub fn claimed(mut self, amount: Decimal) -> Self {
        self.claim.claimed = amount;
        self
    }

    pub fn build(self) -> NewClaim {
        self.claim
    }
}
