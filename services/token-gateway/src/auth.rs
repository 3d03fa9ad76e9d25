//! Login endpoint and session gate middleware
//!
//! - GET  /login — minimal HTML form (target of the gate's redirect)
//! - POST /login — exchange the access password for a session token
//!
//! `require_session` wraps protected routers. It reads the session token
//! from the `token` query parameter first, then the `auth_token` cookie, and
//! redirects to `/login?error=token_expired` when the gate denies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, Request, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use session_gate::{GateDecision, SessionGate, TOKEN_COOKIE, TOKEN_QUERY_PARAM};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::metrics;

/// Request body for POST /login.
///
/// A missing `password` field is treated as the empty password, which only
/// succeeds when the gate is disabled.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    password: String,
}

/// Build the router serving the login page and login endpoint.
pub fn build_login_router(gate: Arc<SessionGate>) -> Router {
    Router::new()
        .route("/login", get(login_page).post(login))
        .with_state(gate)
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Token Gateway Login</title></head>
<body>
<form id="login">
  <input type="password" name="password" placeholder="Access password" autofocus>
  <button type="submit">Log in</button>
</form>
<p id="message"></p>
<script>
document.getElementById("login").addEventListener("submit", async (e) => {
  e.preventDefault();
  const password = e.target.password.value;
  const res = await fetch("/login", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ password }),
  });
  const body = await res.json();
  document.getElementById("message").textContent =
    body.status === "success" ? "Logged in" : body.error;
});
</script>
</body>
</html>
"#;

/// GET /login — static login form.
async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// POST /login — verify the access password and mint a session.
///
/// The token is returned in the body and also set as the `auth_token`
/// cookie so browsers pass the gate without a query parameter.
async fn login(
    State(gate): State<Arc<SessionGate>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "unparseable login body");
            metrics::record_login("bad_request");
            return ApiError::BadRequest(format!("invalid request body: {rejection}"))
                .into_response();
        }
    };

    match gate.issue(&request.password).await {
        Ok(token) => {
            metrics::record_login("success");
            let cookie = format!(
                "{TOKEN_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
                gate.ttl().as_secs()
            );
            let body = serde_json::json!({
                "status": "success",
                "token": token,
            });
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, "application/json".to_string()),
                    (SET_COOKIE, cookie),
                ],
                body.to_string(),
            )
                .into_response()
        }
        Err(session_gate::Error::Unauthorized) => {
            metrics::record_login("unauthorized");
            ApiError::from(session_gate::Error::Unauthorized).into_response()
        }
        Err(e) => {
            warn!(error = %e, "session issuance failed");
            metrics::record_login("error");
            ApiError::from(e).into_response()
        }
    }
}

/// Middleware gating every route of the router it wraps.
pub async fn require_session(
    State(gate): State<Arc<SessionGate>>,
    request: Request,
    next: Next,
) -> Response {
    let query_token = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(TOKEN_QUERY_PARAM));
    let cookie_token = cookie_value(request.headers(), TOKEN_COOKIE);

    match gate
        .check(query_token.as_deref(), cookie_token.as_deref())
        .await
    {
        GateDecision::Allow => {
            metrics::record_gate_decision("allow");
            next.run(request).await
        }
        GateDecision::Deny { redirect } => {
            metrics::record_gate_decision("deny");
            debug!(path = %request.uri().path(), "gate denied request");
            (StatusCode::FOUND, [(LOCATION, redirect)]).into_response()
        }
    }
}

/// First value of cookie `name` across all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
