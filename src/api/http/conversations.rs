// src/api/http/conversations.rs
// Conversation CRUD and sharing, scoped to the caller's session

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{CreateConversationRequest, ShareResponse, UpdateConversationRequest};
use crate::session::SessionId;
use crate::state::AppState;
use crate::store::Conversation;

/// Non-deleted conversations of this session, most recently active first
pub async fn list_conversations(
    State(state): State<AppState>,
    session: SessionId,
) -> ApiResult<Json<Vec<Conversation>>> {
    Ok(Json(state.conversations.list(session.as_str()).await?))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    session: SessionId,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    // An empty body means the default mode
    let request: CreateConversationRequest = if body.is_empty() {
        CreateConversationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };
    let mode = request.mode.unwrap_or_default();
    let conversation = state.conversations.create(session.as_str(), mode).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    Ok(Json(state.conversations.get_owned(&id, session.as_str()).await?))
}

/// Rename and/or switch mode
pub async fn update_conversation(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
    Json(body): Json<UpdateConversationRequest>,
) -> ApiResult<Json<Conversation>> {
    let mut conversation = state.conversations.get_owned(&id, session.as_str()).await?;

    if let Some(title) = body.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::bad_request("Title cannot be empty"));
        }
        conversation = state.conversations.update_title(&id, title).await?;
    }
    if let Some(mode) = body.mode {
        conversation = state.conversations.update_mode(&id, mode).await?;
    }

    Ok(Json(conversation))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.conversations.get_owned(&id, session.as_str()).await?;
    state.conversations.soft_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip public visibility; the token is only present while public
pub async fn toggle_share(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Json<ShareResponse>> {
    state.conversations.get_owned(&id, session.as_str()).await?;
    let share_token = state.conversations.toggle_share(&id).await?;

    Ok(Json(ShareResponse {
        is_public: share_token.is_some(),
        share_token,
    }))
}
