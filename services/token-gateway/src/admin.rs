//! Admin API for the credential pool
//!
//! Mounted behind the session gate. Every response is JSON with a `status`
//! field of `"success"` or `"error"`.
//!
//! Endpoints:
//! - GET    /api/tokens             — list credentials
//! - POST   /api/tokens             — register a credential
//! - DELETE /api/tokens/{token}     — remove a credential
//! - POST   /api/tokens/{token}/use — pin a credential as the default
//! - GET    /api/current-token      — currently pinned credential, if any

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{delete, get, post};
use credential_pool::CredentialPool;
use serde::Deserialize;
use tracing::warn;

use crate::error::{ApiError, json_response};
use crate::metrics;

/// Shared state for admin API handlers.
#[derive(Clone)]
pub struct AdminState {
    pool: Arc<CredentialPool>,
}

impl AdminState {
    pub fn new(pool: Arc<CredentialPool>) -> Self {
        Self { pool }
    }
}

/// Build the admin router. Callers wrap it with the session gate.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/tokens", get(list_tokens).post(register_token))
        .route("/api/tokens/{token}", delete(delete_token))
        .route("/api/tokens/{token}/use", post(use_token))
        .route("/api/current-token", get(current_token))
        .with_state(state)
}

/// Request body for POST /api/tokens.
#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    token: String,
    #[serde(default)]
    tenant_url: String,
}

fn success(extra: serde_json::Value) -> Response {
    let mut body = serde_json::json!({ "status": "success" });
    if let (Some(body), serde_json::Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    json_response(StatusCode::OK, body)
}

/// Record the outcome of a pool operation and pass the result through.
fn observe<T>(operation: &'static str, result: Result<T, ApiError>) -> Result<T, ApiError> {
    let outcome = match &result {
        Ok(_) => "success",
        Err(ApiError::BadRequest(_)) => "bad_request",
        Err(ApiError::NotFound(_)) => "not_found",
        Err(ApiError::Unauthorized(_)) | Err(ApiError::Internal(_)) => "error",
    };
    metrics::record_pool_operation(operation, outcome);
    if let Err(ApiError::Internal(e)) = &result {
        warn!(operation, error = %e, "pool operation failed");
    }
    result
}

/// GET /api/tokens — every registered credential with its tenant URL.
///
/// A failed key enumeration is a 500; unreadable individual records are
/// left out of an otherwise successful listing.
async fn list_tokens(State(state): State<AdminState>) -> Result<Response, ApiError> {
    let credentials = observe("list", state.pool.list().await.map_err(ApiError::from))?;
    Ok(success(serde_json::json!({ "tokens": credentials })))
}

/// POST /api/tokens — add or overwrite a credential.
async fn register_token(
    State(state): State<AdminState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let result = match payload {
        Ok(Json(body)) => state
            .pool
            .register(&body.token, &body.tenant_url)
            .await
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::BadRequest(format!(
            "invalid request body: {rejection}"
        ))),
    };
    observe("register", result)?;
    Ok(success(serde_json::json!({})))
}

/// DELETE /api/tokens/{token}
async fn delete_token(
    State(state): State<AdminState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    observe(
        "delete",
        state.pool.delete(&token).await.map_err(ApiError::from),
    )?;
    Ok(success(serde_json::json!({})))
}

/// POST /api/tokens/{token}/use — pin the credential.
async fn use_token(
    State(state): State<AdminState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    observe("pin", state.pool.pin(&token).await.map_err(ApiError::from))?;
    Ok(success(serde_json::json!({})))
}

/// GET /api/current-token — `token` is null when nothing is pinned.
async fn current_token(State(state): State<AdminState>) -> Result<Response, ApiError> {
    let active = observe(
        "current",
        state.pool.active().await.map_err(ApiError::from),
    )?;
    Ok(success(serde_json::json!({ "token": active })))
}
