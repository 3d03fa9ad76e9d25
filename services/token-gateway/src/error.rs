//! HTTP-facing error type
//!
//! Library errors are mapped onto a status code plus the JSON body
//! `{"status":"error","error":"..."}` shared by every API endpoint.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors a handler can return to the client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": "error",
            "error": self.to_string(),
        });
        json_response(self.status(), body)
    }
}

impl From<credential_pool::Error> for ApiError {
    fn from(err: credential_pool::Error) -> Self {
        match err {
            credential_pool::Error::MissingToken => ApiError::BadRequest(err.to_string()),
            credential_pool::Error::NotFound(_) => ApiError::NotFound(err.to_string()),
            credential_pool::Error::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<session_gate::Error> for ApiError {
    fn from(err: session_gate::Error) -> Self {
        match err {
            session_gate::Error::Unauthorized => ApiError::Unauthorized(err.to_string()),
            session_gate::Error::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Serialize `body` with a JSON content type.
pub fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, [(CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_client_and_server_statuses() {
        assert_eq!(
            ApiError::from(credential_pool::Error::MissingToken).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(credential_pool::Error::NotFound("abc…".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(credential_pool::Error::Store(kv_store::Error::Connection(
                "refused".into()
            )))
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn gate_errors_map_to_401_and_500() {
        assert_eq!(
            ApiError::from(session_gate::Error::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(session_gate::Error::Store(kv_store::Error::Command(
                "READONLY".into()
            )))
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn error_body_has_status_and_message() {
        let response = ApiError::NotFound("credential not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "credential not found");
    }
}
