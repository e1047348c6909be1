//! Coverage Domain
//!
//! Policies scoped to a family, with a coverage window and an optional
//! suspension override.
//!
//! # Policy Status
//!
//! ```text
//! today < effective          -> INACTIVE
//! effective <= today <= expiry -> ACTIVE
//! today > expiry             -> EXPIRED
//! suspended                  -> SUSPENDED (overrides the window)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_policy::{PolicyBuilder, PolicyDates};
//!
//! let policy = PolicyBuilder::new()
//!     .family(family_id)
//!     .product_code("BASIC")
//!     .dates(dates)
//!     .value(dec!(10000))
//!     .build(&actor, clock.now())?;
//! ```

pub mod aggregate;
pub mod error;

pub use aggregate::{Policy, PolicyBuilder, PolicyDates, PolicyStatus, PolicyView};
pub use error::PolicyError;
