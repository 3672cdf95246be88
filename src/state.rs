// src/state.rs

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::AuthGate,
    chat::ChatService,
    config::Config,
    events::EventHub,
    llm::ChatProvider,
    store::{ConversationStore, MessageStore, UsageLedger},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthGate,

    // -------- Storage --------
    pub db: SqlitePool,
    pub events: EventHub,
    pub conversations: ConversationStore,
    pub messages: MessageStore,
    pub usage: UsageLedger,

    // -------- Services --------
    pub chat: ChatService,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool, provider: Arc<dyn ChatProvider>) -> Self {
        let usage = UsageLedger::new(db.clone());
        Self::with_usage(config, db, provider, usage)
    }

    /// Assemble state around an explicit ledger (e.g. one with a fixed date)
    pub fn with_usage(
        config: Config,
        db: SqlitePool,
        provider: Arc<dyn ChatProvider>,
        usage: UsageLedger,
    ) -> Self {
        let events = EventHub::new();
        let conversations = ConversationStore::new(db.clone(), events.clone());
        let messages = MessageStore::new(db.clone(), events.clone());

        let chat = ChatService::new(
            conversations.clone(),
            messages.clone(),
            usage.clone(),
            provider,
            Duration::from_millis(config.stream_flush_ms),
        );

        let auth = AuthGate::new(
            config.site_password.clone(),
            config.cookie_secret.clone(),
            config.cookie_secure,
        );

        Self {
            config: Arc::new(config),
            auth,
            db,
            events,
            conversations,
            messages,
            usage,
            chat,
        }
    }
}
