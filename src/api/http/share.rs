// src/api/http/share.rs
// Read-only access to a publicly shared conversation

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{SharedConversation, SharedConversationResponse};
use crate::state::AppState;

/// No session or login required. Unknown, revoked and deleted tokens all
/// look the same.
pub async fn get_shared_conversation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<SharedConversationResponse>> {
    let conversation = state
        .conversations
        .get_by_share_token(&token)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;

    let messages = state.messages.list(&conversation.id).await?;

    Ok(Json(SharedConversationResponse {
        conversation: SharedConversation {
            title: conversation.title,
            mode: conversation.mode,
            created_at: conversation.created_at,
        },
        messages,
    }))
}
