//! Test Utilities Crate
//!
//! Shared test infrastructure for the household coverage workspace.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built dates, contexts, reference data and inputs
//! - `builders`: Builders for domain inputs
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for service results
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
