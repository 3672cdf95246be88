//! Chat gateway to the external theological model.
//!
//! The gateway is stateless: it takes a message history plus a [`Mode`],
//! prepends the matching system prompt and streams text back, with the
//! provider's citation list delivered once the upstream call completes.

pub mod magisterium;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::store::{Citation, Message, Mode, Role};

pub use magisterium::MagisteriumClient;

const STANDARD_PROMPT: &str = include_str!("system_prompts/standard.md");
const AQUINAS_PROMPT: &str = include_str!("system_prompts/aquinas.md");

pub fn system_prompt(mode: Mode) -> &'static str {
    match mode {
        Mode::Standard => STANDARD_PROMPT,
        Mode::Aquinas => AQUINAS_PROMPT,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
        }
    }
}

/// One relay call: prior history and the prompt template to use
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub mode: Mode,
    pub messages: Vec<ChatMessage>,
}

/// Incremental output of a streamed reply
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Text(String),
    /// Out-of-band metadata, sent after the text once the call completes
    Citations(Vec<Citation>),
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, GatewayError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("MAGISTERIUM_API_KEY is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("stream error: {0}")]
    Stream(String),
}

/// Anything that can stream a chat completion
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError>;
}
