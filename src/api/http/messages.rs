// src/api/http/messages.rs
// Message listing and maintenance

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{CountResponse, DeletedResponse, UpdateMessageRequest};
use crate::session::SessionId;
use crate::state::AppState;
use crate::store::Message;

pub async fn list_messages(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    state.conversations.get_owned(&id, session.as_str()).await?;
    Ok(Json(state.messages.list(&id).await?))
}

pub async fn count_messages(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Json<CountResponse>> {
    state.conversations.get_owned(&id, session.as_str()).await?;
    Ok(Json(CountResponse {
        count: state.messages.count(&id).await?,
    }))
}

pub async fn delete_last_assistant(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.conversations.get_owned(&id, session.as_str()).await?;
    Ok(Json(DeletedResponse {
        deleted: state.messages.delete_last_assistant(&id).await?,
    }))
}

/// Rewrite a message's content (and optionally its citations). Only
/// messages of the caller's own conversations can be touched.
pub async fn update_message(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
    Json(body): Json<UpdateMessageRequest>,
) -> ApiResult<Json<Message>> {
    let message = state
        .messages
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    state
        .conversations
        .get_owned(&message.conversation_id, session.as_str())
        .await?;

    Ok(Json(
        state
            .messages
            .update_message(&id, &body.content, body.citations)
            .await?,
    ))
}
