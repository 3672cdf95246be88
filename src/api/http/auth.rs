// src/api/http/auth.rs
// Password login and logout

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::types::LoginRequest;
use crate::state::AppState;

/// Exchange the shared password for the signed auth cookie
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    let value = state.auth.login(&body.password, Utc::now().timestamp())?;

    info!("Successful login");
    Ok((
        [(header::SET_COOKIE, state.auth.set_cookie(&value))],
        Json(json!({ "success": true })),
    )
        .into_response())
}

pub async fn logout_handler(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, state.auth.clear_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response()
}
