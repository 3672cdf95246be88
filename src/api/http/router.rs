// src/api/http/router.rs
// Route table for the JSON/SSE API, nested under /api

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};

use super::{auth, chat, conversations, handlers, messages, share};
use crate::state::AppState;

/// Chat bodies carry whole histories on the relay route
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn api_router() -> Router<AppState> {
    Router::new()
        // Public
        .route("/health", get(handlers::health_handler))
        .route("/auth", post(auth::login_handler))
        .route("/logout", post(auth::logout_handler))
        .route("/share/{token}", get(share::get_shared_conversation))

        // Session and quota
        .route("/session", get(handlers::session_handler))
        .route("/usage", get(handlers::usage_handler))

        // Conversations
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(conversations::get_conversation)
                .patch(conversations::update_conversation)
                .delete(conversations::delete_conversation),
        )
        .route("/conversations/{id}/share", post(conversations::toggle_share))

        // Messages
        .route("/conversations/{id}/messages", get(messages::list_messages))
        .route("/conversations/{id}/messages/count", get(messages::count_messages))
        .route("/conversations/{id}/messages/last", delete(messages::delete_last_assistant))
        .route("/messages/{id}", patch(messages::update_message))

        // Streaming
        .route("/conversations/{id}/send", post(chat::send_handler))
        .route("/conversations/{id}/regenerate", post(chat::regenerate_handler))
        .route("/conversations/{id}/events", get(chat::events_handler))
        .route("/chat", post(chat::relay_handler))

        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
