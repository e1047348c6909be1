//! Household Coverage - API Server Binary
//!
//! Starts the HTTP API over PostgreSQL, or over the in-memory store when no
//! database URL is configured.
//!
//! # Usage
//!
//! ```bash
//! # In-memory store, built-in reference tables
//! cargo run --bin household-api
//!
//! # PostgreSQL
//! API_DATABASE_URL=postgres://... cargo run --bin household-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_REFERENCE_DATA_PATH` - JSON reference tables
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! * `API_SERVICES__*` - Service tunables, e.g. `API_SERVICES__HEAD_REPLACEMENT=auto_demote`

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app_services::{InMemoryStore, Services, Store};
use core_kernel::SystemClock;
use domain_reference::StaticReferenceData;
use infra_db::DatabaseConfig;
use interface_api::config::{ApiConfig, LogFormat};
use interface_api::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API configuration")?;

    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting household coverage API server"
    );

    let store = open_store(&config).await?;
    let reference = load_reference_data(config.reference_data_path.as_deref())?;
    let services = Services::new(
        store,
        Arc::new(reference),
        config.services.clone(),
        Arc::new(SystemClock),
    );

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;
    let app = create_router(Arc::new(services), config);

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Connects to PostgreSQL and migrates, or falls back to the in-memory store
async fn open_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn Store>> {
    let lock_timeout = Duration::from_millis(config.services.lock_timeout_ms);
    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db_config = DatabaseConfig::new(url.clone()).lock_timeout(lock_timeout);
            let store = infra_db::connect(&db_config)
                .await
                .context("failed to open the PostgreSQL store")?;
            tracing::info!("Database ready");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No database URL configured, using the in-memory store");
            Ok(Arc::new(InMemoryStore::new().with_lock_timeout(lock_timeout)))
        }
    }
}

fn load_reference_data(path: Option<&str>) -> anyhow::Result<StaticReferenceData> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read reference data from {}", path))?;
            let data = StaticReferenceData::from_json(&json)
                .with_context(|| format!("invalid reference data in {}", path))?;
            tracing::info!(path, "Reference data loaded");
            Ok(data)
        }
        None => Ok(StaticReferenceData::builtin()),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
