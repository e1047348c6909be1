//! Claims Domain
//!
//! Claims reference an insuree and a health facility by stable identifier
//! and belong to no aggregate; they outlive membership and family changes.
//!
//! # Claim Lifecycle
//!
//! ```text
//! ENTERED -> CHECKED -> PROCESSED -> VALUATED
//!    \           \           \
//!     `-----------`-----------`--> REJECTED
//! ```
//!
//! VALUATED and REJECTED are terminal. Every committed transition is
//! recorded as a [`ClaimStatusChange`].

pub mod claim;
pub mod history;
pub mod error;

pub use claim::{Claim, ClaimAmounts, ClaimStatus, NewClaim, VisitType, generate_claim_code};
pub use history::{ClaimStatusChange, is_valid_path};
pub use error::ClaimError;
