// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::auth::AuthError;
use crate::chat::TurnError;
use crate::llm::GatewayError;
use crate::store::StoreError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    fn new(status_code: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code: Some(code.to_string()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "LIMIT_REACHED", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status_code.as_u16(),
        });

        if let Some(error_code) = self.error_code {
            body["error_code"] = json!(error_code);
        }

        (self.status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::not_found("Not found"),
            other => {
                error!("Store error: {:?}", other);
                ApiError::internal("Database error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotConfigured => {
                error!("SITE_PASSWORD environment variable not set");
                ApiError::internal(e.to_string())
            }
            AuthError::InvalidPassword => ApiError::unauthorized(e.to_string()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        error!("Chat API error: {}", e);
        ApiError::internal("Failed to process chat request")
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::NotFound => ApiError::not_found(e.to_string()),
            TurnError::EmptyMessage => ApiError::bad_request(e.to_string()),
            TurnError::QuotaExceeded => ApiError::too_many_requests(e.to_string()),
            TurnError::Store(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status() {
        assert_eq!(ApiError::from(StoreError::NotFound).status_code, StatusCode::NOT_FOUND);
        let db = ApiError::from(StoreError::Database(sqlx::Error::PoolClosed));
        assert_eq!(db.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.message, "Database error");
    }

    #[test]
    fn auth_and_quota_errors_keep_user_facing_text() {
        let wrong = ApiError::from(AuthError::InvalidPassword);
        assert_eq!(wrong.status_code, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.message, "Invalid password");

        let quota = ApiError::from(TurnError::QuotaExceeded);
        assert_eq!(quota.status_code, StatusCode::TOO_MANY_REQUESTS);
        assert!(quota.message.contains("limit reached"));
    }

    #[test]
    fn upstream_failures_are_generic() {
        let e = ApiError::from(GatewayError::Upstream { status: 503, body: "secret detail".into() });
        assert_eq!(e.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "Failed to process chat request");
    }
}
