//! Household Domain
//!
//! Insurees, families and the memberships that link them.
//!
//! # Invariants
//!
//! - An insuree has at most one active membership
//! - A family has at most one active head membership, and the family's
//!   head reference always names that member
//! - Memberships are never deleted; leaving a family ends the record with a
//!   terminal status (inactive, transferred or deceased)
//!
//! # Head succession
//!
//! When the head leaves a family that still has active members, the oldest
//! adult member is promoted. Without adults the oldest member is promoted.
//! A family with no remaining members has no head.

pub mod insuree;
pub mod family;
pub mod membership;
pub mod headship;
pub mod error;

pub use insuree::{Insuree, InsureeStatus, MaritalStatus, InsureeDetails, InsureeChanges};
pub use family::{Family, FamilyDetails, FamilyChanges};
pub use membership::{FamilyMembership, MembershipStatus};
pub use headship::{check_head_invariant, select_successor, SuccessionCandidate};
pub use error::HouseholdError;
