//! Reference Data
//!
//! Read-only lookup tables consulted when validating household and claims
//! input. Codes are stable external keys; names are for display only.
//!
//! The built-in tables cover the codes every deployment needs. A deployment
//! may replace them with a JSON document of the same shape:
//!
//! ```rust,ignore
//! let reference = StaticReferenceData::from_json(&std::fs::read_to_string(path)?)?;
//! assert!(reference.is_known(ReferenceKind::Relationship, "RL-001"));
//! ```

pub mod tables;
pub mod provider;
pub mod error;

pub use tables::{ReferenceEntry, ReferenceKind, Location, HealthFacility, ReferenceTables};
pub use provider::{ReferenceData, StaticReferenceData, normalize_facility_code};
pub use error::ReferenceError;
