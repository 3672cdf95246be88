//! Chat turns: quota gate, persistence and the streamed reply.
//!
//! [`ChatService::relay`] is the stateless gateway. [`ChatService::send`]
//! and [`ChatService::regenerate`] run the whole turn server-side and
//! return a channel of [`TurnEvent`]s. The upstream stream is consumed by
//! a detached task, so a client that stops listening does not lose the
//! persisted reply.

use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::llm::{ChatMessage, ChatProvider, ChatRequest, ChatStream, GatewayError, StreamChunk};
use crate::store::{
    Citation, ConversationStore, DEFAULT_TITLE, Message, MessageStore, Mode, StoreError, UsageLedger,
    title_from_message,
};

const EVENT_BUFFER: usize = 64;

/// What the caller of a turn sees, in order
#[derive(Debug, Clone)]
pub enum TurnEvent {
    UserMessage(Message),
    Text(String),
    Citations(Vec<Citation>),
    Done(Message),
    Error(String),
}

impl TurnEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TurnEvent::UserMessage(_) => "user_message",
            TurnEvent::Text(_) => "text",
            TurnEvent::Citations(_) => "citations",
            TurnEvent::Done(_) => "done",
            TurnEvent::Error(_) => "error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Conversation not found")]
    NotFound,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Daily message limit reached. Try again tomorrow.")]
    QuotaExceeded,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TurnError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => TurnError::NotFound,
            other => TurnError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct ChatService {
    conversations: ConversationStore,
    messages: MessageStore,
    usage: UsageLedger,
    provider: Arc<dyn ChatProvider>,
    flush_interval: Duration,
}

impl ChatService {
    pub fn new(
        conversations: ConversationStore,
        messages: MessageStore,
        usage: UsageLedger,
        provider: Arc<dyn ChatProvider>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            conversations,
            messages,
            usage,
            provider,
            flush_interval,
        }
    }

    /// Stateless relay: history plus the mode's system prompt, streamed back
    pub async fn relay(&self, mode: Mode, messages: Vec<ChatMessage>) -> Result<ChatStream, GatewayError> {
        self.provider.stream_chat(ChatRequest { mode, messages }).await
    }

    /// Accept a user message and stream the assistant's reply.
    ///
    /// Refusals (missing conversation, empty text, exhausted quota) happen
    /// before anything is written.
    pub async fn send(
        &self,
        session_id: &str,
        conversation_id: &str,
        content: &str,
    ) -> Result<mpsc::Receiver<TurnEvent>, TurnError> {
        let conversation = self.conversations.get_owned(conversation_id, session_id).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        // The slot is taken before the message is written, so two racing
        // sends cannot both pass the limit
        let Some(used) = self.usage.try_consume(session_id).await? else {
            return Err(TurnError::QuotaExceeded);
        };
        debug!("Session {} has sent {} messages today", session_id, used);

        let first_message = self.messages.count(conversation_id).await? == 0;
        let user_message = self.messages.add_user_message(conversation_id, content).await?;

        if first_message && conversation.title == DEFAULT_TITLE {
            self.conversations
                .update_title(conversation_id, &title_from_message(content))
                .await?;
        }

        let history = self.history(conversation_id).await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx.send(TurnEvent::UserMessage(user_message)).await;

        self.spawn_reply(conversation.mode, conversation_id.to_string(), history, tx);
        Ok(rx)
    }

    /// Drop the last assistant reply (if any) and answer the remaining
    /// history again. Gated by the quota but not counted against it.
    pub async fn regenerate(
        &self,
        session_id: &str,
        conversation_id: &str,
    ) -> Result<mpsc::Receiver<TurnEvent>, TurnError> {
        let conversation = self.conversations.get_owned(conversation_id, session_id).await?;

        if !self.usage.can_send(session_id).await? {
            return Err(TurnError::QuotaExceeded);
        }

        if let Some(id) = self.messages.delete_last_assistant(conversation_id).await? {
            info!("Regenerating reply {} in {}", id, conversation_id);
        }

        let history = self.history(conversation_id).await?;
        if history.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.spawn_reply(conversation.mode, conversation_id.to_string(), history, tx);
        Ok(rx)
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, TurnError> {
        Ok(self
            .messages
            .list(conversation_id)
            .await?
            .iter()
            .map(ChatMessage::from)
            .collect())
    }

    fn spawn_reply(
        &self,
        mode: Mode,
        conversation_id: String,
        history: Vec<ChatMessage>,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let service = self.clone();
        tokio::spawn(async move {
            service.stream_reply(mode, conversation_id, history, tx).await;
        });
    }

    async fn stream_reply(
        &self,
        mode: Mode,
        conversation_id: String,
        history: Vec<ChatMessage>,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let mut stream = match self.relay(mode, history).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Chat API error for {}: {}", conversation_id, e);
                let _ = tx.send(TurnEvent::Error("Failed to get response".into())).await;
                return;
            }
        };

        // A send error only means the client stopped listening; keep going
        // so the reply is still persisted.
        let mut text = String::new();
        let mut citations: Option<Vec<Citation>> = None;
        let mut reply: Option<Message> = None;
        let mut last_flush = Instant::now();

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(StreamChunk::Text(delta)) => {
                    text.push_str(&delta);
                    let _ = tx.send(TurnEvent::Text(delta)).await;

                    let write = match &reply {
                        None => self.messages.add_assistant_message(&conversation_id, &text, None).await,
                        Some(m) if last_flush.elapsed() >= self.flush_interval => {
                            self.messages.update_message(&m.id, &text, None).await
                        }
                        Some(_) => continue,
                    };
                    match write {
                        Ok(message) => {
                            reply = Some(message);
                            last_flush = Instant::now();
                        }
                        Err(e) => warn!("Could not persist partial reply: {}", e),
                    }
                }
                Ok(StreamChunk::Citations(list)) => {
                    let _ = tx.send(TurnEvent::Citations(list.clone())).await;
                    citations = Some(list);
                }
                Err(e) => {
                    error!("Reply stream for {} failed: {}", conversation_id, e);
                    if let Some(partial) = &reply {
                        if let Err(e) = self.messages.delete(&partial.id).await {
                            warn!("Could not remove partial reply {}: {}", partial.id, e);
                        }
                    }
                    let _ = tx.send(TurnEvent::Error("Failed to get response".into())).await;
                    return;
                }
            }
        }

        let finished = match reply {
            Some(m) => self.messages.update_message(&m.id, &text, citations).await,
            None => self
                .messages
                .add_assistant_message(&conversation_id, &text, citations)
                .await,
        };

        match finished {
            Ok(message) => {
                info!("Reply {} persisted ({} chars)", message.id, message.content.len());
                let _ = tx.send(TurnEvent::Done(message)).await;
            }
            Err(e) => {
                error!("Could not persist reply for {}: {}", conversation_id, e);
                let _ = tx.send(TurnEvent::Error("Failed to save response".into())).await;
            }
        }
    }
}
