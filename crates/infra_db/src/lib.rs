//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the household coverage services, built on SQLx.
//!
//! # Architecture
//!
//! The crate implements the `Store` and `UnitOfWork` ports declared by
//! `app_services`. A unit of work wraps one transaction; the schema's unique
//! and partial indexes back up the membership and identifier invariants the
//! services enforce, and their violations come back as `Duplicate` or
//! `Conflict` port errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{connect, DatabaseConfig};
//!
//! let store = connect(&DatabaseConfig::new("postgres://localhost/household")).await?;
//! let services = Services::new(Arc::new(store), reference, config, clock);
//! ```

pub mod error;
pub mod pool;
pub mod rows;
pub mod store;

pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use store::{PgStore, PgUnitOfWork};

/// Creates a pool, applies migrations and wraps the pool in a [`PgStore`]
pub async fn connect(config: &DatabaseConfig) -> Result<PgStore, DatabaseError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(PgStore::new(pool, config.lock_timeout))
}
