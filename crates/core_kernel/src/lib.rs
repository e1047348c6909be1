//! Core Kernel - Foundational types shared by the household coverage system
//!
//! This crate provides the building blocks used across all domain modules:
//! - Strongly-typed identifiers
//! - The error taxonomy and the success/failure result envelope
//! - Audit stamping, actors and clocks
//! - Operation context carrying the caller's authorization decision
//! - Port plumbing shared by storage adapters
//! - Mapping of input validation failures to field errors

pub mod identifiers;
pub mod error;
pub mod result;
pub mod audit;
pub mod context;
pub mod ports;
pub mod validation;

pub use identifiers::{
    InsureeId, FamilyId, MembershipId, PolicyId, ClaimId, ClaimStatusChangeId, AuditEntryId,
};
pub use error::{CoreError, ErrorCode, FieldError};
pub use result::OperationResult;
pub use audit::{Actor, AuditStamp, Clock, SystemClock, FixedClock};
pub use context::{AuthorizationDecision, OperationContext};
pub use ports::{PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable};
pub use validation::validate_input;
