//! Database Test Utilities
//!
//! Starts a throwaway PostgreSQL container, applies the workspace migrations
//! and hands out a pool. Tests using it need Docker and are marked
//! `#[ignore]`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "household";
const POSTGRES_PASSWORD: &str = "household";
const POSTGRES_DB: &str = "household_test";

/// Tables in delete-safe order
const TABLES: [&str; 7] = [
    "audit_log",
    "claim_status_history",
    "claims",
    "policies",
    "family_memberships",
    "insurees",
    "families",
];

pub type TestDbError = Box<dyn std::error::Error + Send + Sync>;

/// A migrated PostgreSQL instance living as long as this value
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    url: String,
    pool: PgPool,
}

impl TestDatabase {
    /// Starts the container and applies migrations
    ///
    /// # Errors
    ///
    /// Returns an error if Docker is unavailable, the container does not
    /// become ready, or a migration fails.
    pub async fn start() -> Result<Self, TestDbError> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let url = connection_url(&host.to_string(), port);

        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of rows in a table
    pub async fn row_count(&self, table: &str) -> Result<i64, TestDbError> {
        if !TABLES.contains(&table) {
            return Err(format!("unknown table {}", table).into());
        }
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Deletes all rows, keeping the schema
    pub async fn truncate(&self) -> Result<(), TestDbError> {
        sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", TABLES.join(", ")))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn connection_url(host: &str, port: u16) -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}",
        POSTGRES_USER, POSTGRES_PASSWORD, host, port, POSTGRES_DB
    )
}
