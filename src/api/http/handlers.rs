// src/api/http/handlers.rs
// Health, session and usage endpoints

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::api::error::ApiResult;
use crate::api::types::{SessionResponse, UsageResponse};
use crate::session::SessionId;
use crate::state::AppState;

/// Health check handler
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.magisterium_model,
        "upstream_configured": state.config.magisterium_api_key.is_some(),
        "timestamp": Utc::now().to_rfc3339()
    }))
}

pub async fn session_handler(session: SessionId) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: session.as_str().to_string(),
    })
}

/// Today's count, the fixed limit and whether another message may be sent
pub async fn usage_handler(
    State(state): State<AppState>,
    session: SessionId,
) -> ApiResult<Json<UsageResponse>> {
    let summary = state.usage.get_today_usage(session.as_str()).await?;
    Ok(Json(summary.into()))
}
