//! Operation endpoint
//!
//! `POST /api/v1/operations` takes a tagged [`Operation`] and answers with its
//! `OperationResult`. The HTTP status mirrors the first error code.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use tracing::info;

use app_services::{Operation, OperationOutput};
use core_kernel::{Actor, OperationContext, OperationResult};

use crate::auth::{authorize, Claims};
use crate::error::{status_for, ApiError};
use crate::middleware::REQUEST_ID_HEADER;
use crate::AppState;

/// Executes one service operation on behalf of the token holder
pub async fn execute_operation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    payload: Result<Json<Operation>, JsonRejection>,
) -> Result<(StatusCode, Json<OperationResult<OperationOutput>>), ApiError> {
    let Json(operation) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let permission = operation.required_permission();
    let mut ctx = OperationContext::for_actor(Actor::new(claims.sub.clone()))
        .with_authorization(authorize(&claims, permission));
    if let Some(request_id) = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_correlation_id(request_id);
    }

    info!(
        operation = operation.name(),
        permission = %permission,
        actor = %ctx.actor,
        correlation_id = ?ctx.correlation_id,
        "Executing operation"
    );

    let result = state.services.execute(&ctx, operation).await;
    let status = result.error_code().map(status_for).unwrap_or(StatusCode::OK);
    Ok((status, Json(result)))
}
