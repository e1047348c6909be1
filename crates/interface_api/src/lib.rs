//! HTTP API Layer
//!
//! A thin axum adapter over the household coverage services.
//!
//! # Architecture
//!
//! - **Handlers**: health probes and a single operation endpoint
//! - **Middleware**: authentication, request ids, tracing, audit logging
//! - **Auth**: JWT validation and role to permission mapping
//! - **Error Handling**: failures rendered as `OperationResult` envelopes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(Arc::new(services), config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    http::HeaderName,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use app_services::Services;

use crate::config::ApiConfig;
use crate::handlers::{health, operations};
use crate::middleware::{audit_middleware, auth_middleware, REQUEST_ID_HEADER};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub config: Arc<ApiConfig>,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `services` - The service layer over its store
/// * `config` - API configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(services: Arc<Services>, config: ApiConfig) -> Router {
    let state = AppState {
        services,
        config: Arc::new(config),
    };
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Protected API routes
    let api_routes = Router::new()
        .route("/operations", post(operations::execute_operation))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
