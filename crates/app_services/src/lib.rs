//! Application Services - transactional operations over households,
//! policies and claims
//!
//! Every mutating operation follows the same sequence:
//!
//! 1. check the caller's authorization decision,
//! 2. validate input before touching the store,
//! 3. open a unit of work, lock the rows it changes and re-read them,
//! 4. apply the domain change and append audit entries,
//! 5. commit, or roll back on any error.
//!
//! Transient store conflicts are retried a bounded number of times.
//!
//! # Example
//!
//! ```rust,ignore
//! use app_services::{InMemoryStore, Operation, ServiceConfig, Services};
//!
//! let services = Services::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(StaticReferenceData::builtin()),
//!     ServiceConfig::default(),
//!     Arc::new(SystemClock),
//! );
//! let result = services.execute(&ctx, operation).await;
//! ```

pub mod audit;
pub mod claims;
pub mod config;
pub mod coverage;
pub mod household;
pub mod memory;
pub mod operations;
pub mod ports;
pub mod tx;

pub use audit::{AuditEntry, EntityKind};
pub use claims::{ClaimsService, ProcessClaim};
pub use config::{HeadReplacementPolicy, ServiceConfig};
pub use coverage::{CoverageService, NewPolicy, RenewPolicy, SuspendPolicy};
pub use household::{
    AddFamilyMember, ChangeInsureeStatus, CreateInsuree, HouseholdService, RemoveFamilyMember,
    SetHeadOfFamily, TransferFamilyMember, UpdateFamily, UpdateInsuree,
};
pub use memory::{InMemoryStore, MemoryState};
pub use operations::{
    ChfIdRef, ClaimRef, FamilyRef, InsureeRef, Operation, OperationOutput, Permission, PolicyRef,
    Services,
};
pub use ports::{Store, UnitOfWork};
