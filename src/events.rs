// src/events.rs
// Change notifications pushed to conversation subscribers

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

use crate::store::{Conversation, Message};

const CHANNEL_CAPACITY: usize = 256;

/// A mutation that subscribers of a conversation should know about
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    MessageAdded { message: Message },
    MessageUpdated { message: Message },
    MessageDeleted { conversation_id: String, message_id: String },
    ConversationUpdated { conversation: Conversation },
    ConversationDeleted { conversation_id: String },
}

impl ChangeEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            ChangeEvent::MessageAdded { message } | ChangeEvent::MessageUpdated { message } => {
                &message.conversation_id
            }
            ChangeEvent::MessageDeleted { conversation_id, .. }
            | ChangeEvent::ConversationDeleted { conversation_id } => conversation_id,
            ChangeEvent::ConversationUpdated { conversation } => &conversation.id,
        }
    }

    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::MessageAdded { .. } => "message_added",
            ChangeEvent::MessageUpdated { .. } => "message_updated",
            ChangeEvent::MessageDeleted { .. } => "message_deleted",
            ChangeEvent::ConversationUpdated { .. } => "conversation_updated",
            ChangeEvent::ConversationDeleted { .. } => "conversation_deleted",
        }
    }
}

/// Fan-out hub shared by all stores
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Emit an event (non-blocking, ignores if no subscribers)
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    /// Events for one conversation only. Lagged receivers skip what they
    /// missed and keep going.
    pub fn subscribe(
        &self,
        conversation_id: &str,
    ) -> impl Stream<Item = ChangeEvent> + Send + 'static + use<> {
        let wanted = conversation_id.to_string();
        BroadcastStream::new(self.tx.subscribe()).filter_map(move |item| {
            let wanted = wanted.clone();
            async move {
                match item {
                    Ok(event) if event.conversation_id() == wanted => Some(event),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        debug!("Subscription for {} lagged by {} events", wanted, n);
                        None
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_filters_by_conversation() {
        let hub = EventHub::new();
        let stream = hub.subscribe("a");
        tokio::pin!(stream);

        hub.publish(ChangeEvent::ConversationDeleted { conversation_id: "b".into() });
        hub.publish(ChangeEvent::ConversationDeleted { conversation_id: "a".into() });

        let event = stream.next().await.unwrap();
        assert_eq!(event.conversation_id(), "a");
        assert_eq!(event.name(), "conversation_deleted");
    }
}
