// src/api/http/chat.rs
// Streaming endpoints: chat turns, the stateless relay and change subscriptions

use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde_json::json;
use std::{convert::Infallible, time::Duration};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{RelayRequest, SendMessageRequest};
use crate::chat::TurnEvent;
use crate::events::ChangeEvent;
use crate::llm::StreamChunk;
use crate::session::SessionId;
use crate::state::AppState;

const KEEP_ALIVE_SECS: u64 = 15;

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(KEEP_ALIVE_SECS))
        .text("ping")
}

fn turn_event(event: TurnEvent) -> Event {
    let name = event.name();
    let data = match event {
        TurnEvent::UserMessage(message) | TurnEvent::Done(message) => json!(message),
        TurnEvent::Text(text) => json!({ "text": text }),
        TurnEvent::Citations(citations) => json!({ "citations": citations }),
        TurnEvent::Error(message) => json!({ "error": message }),
    };
    Event::default().event(name).data(data.to_string())
}

fn change_event(event: ChangeEvent) -> Option<Event> {
    match serde_json::to_string(&event) {
        Ok(json) => Some(Event::default().event(event.name()).data(json)),
        Err(e) => {
            error!("Could not serialize {} event: {}", event.name(), e);
            None
        }
    }
}

/// Send a user message; the response streams the whole turn
pub async fn send_handler(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let rx = state.chat.send(session.as_str(), &id, &body.content).await?;
    let stream = ReceiverStream::new(rx).map(|event| Ok(turn_event(event)));
    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

/// Replace the last assistant reply with a fresh one
pub async fn regenerate_handler(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let rx = state.chat.regenerate(session.as_str(), &id).await?;
    let stream = ReceiverStream::new(rx).map(|event| Ok(turn_event(event)));
    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

/// Stateless relay: nothing is stored and no quota is consumed. Failures
/// before the first byte are a 500, later ones an `error` event.
pub async fn relay_handler(
    State(state): State<AppState>,
    Json(body): Json<RelayRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if body.messages.is_empty() {
        return Err(ApiError::bad_request("messages cannot be empty"));
    }

    info!("Relaying {} messages ({} mode)", body.messages.len(), body.mode);
    let mut upstream = state.chat.relay(body.mode, body.messages).await?;

    let stream = async_stream::stream! {
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(StreamChunk::Text(text)) => {
                    yield Ok(Event::default().event("text").data(json!({ "text": text }).to_string()));
                }
                Ok(StreamChunk::Citations(citations)) => {
                    yield Ok(Event::default()
                        .event("citations")
                        .data(json!({ "citations": citations }).to_string()));
                }
                Err(e) => {
                    error!("Chat API error: {}", e);
                    yield Ok(Event::default()
                        .event("error")
                        .data(json!({ "error": "Failed to process chat request" }).to_string()));
                    return;
                }
            }
        }
        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

/// Live change notifications for one conversation
pub async fn events_handler(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    state.conversations.get_owned(&id, session.as_str()).await?;

    let stream = state
        .events
        .subscribe(&id)
        .filter_map(|event| async move { change_event(event).map(Ok) });

    Ok(Sse::new(stream).keep_alive(keep_alive()))
}

