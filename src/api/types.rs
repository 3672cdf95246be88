// src/api/types.rs
// Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;
use crate::store::{Citation, Message, Mode, UsageSummary};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub mode: Option<Mode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMessageRequest {
    pub content: String,
    #[serde(default)]
    pub citations: Option<Vec<Citation>>,
}

/// Body of the stateless relay: full history and the answer style
#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    #[serde(flatten)]
    pub summary: UsageSummary,
    pub can_send: bool,
}

impl From<UsageSummary> for UsageResponse {
    fn from(summary: UsageSummary) -> Self {
        Self {
            can_send: summary.can_send(),
            summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub is_public: bool,
    pub share_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: Option<String>,
}

/// The parts of a conversation a shared link may reveal
#[derive(Debug, Serialize)]
pub struct SharedConversation {
    pub title: String,
    pub mode: Mode,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct SharedConversationResponse {
    pub conversation: SharedConversation,
    pub messages: Vec<Message>,
}
