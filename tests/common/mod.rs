// tests/common/mod.rs
// Shared fixtures: in-memory state and a scripted chat provider

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use quaestio::{
    AppState,
    chat::TurnEvent,
    config::Config,
    db,
    llm::{ChatProvider, ChatRequest, ChatStream, GatewayError, StreamChunk},
    store::{Citation, UsageLedger},
};

pub const PASSWORD: &str = "pax-et-bonum";

pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 25).unwrap()
}

/// One step of a scripted reply
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    Citations(Vec<Citation>),
    Fail,
}

/// Replays a fixed reply for every request and records what it was sent
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Vec<Step>,
    refuse: bool,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn replying(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            ..Default::default()
        })
    }

    /// Fails before any bytes are produced
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Default::default()
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if self.refuse {
            return Err(GatewayError::Upstream {
                status: 503,
                body: "unavailable".into(),
            });
        }

        let items: Vec<Result<StreamChunk, GatewayError>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Text(t) => Ok(StreamChunk::Text(t.to_string())),
                Step::Citations(c) => Ok(StreamChunk::Citations(c.clone())),
                Step::Fail => Err(GatewayError::Stream("connection reset".into())),
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(items)))
    }
}

pub fn citation(title: &str) -> Citation {
    Citation {
        title: title.to_string(),
        source: format!("Excerpt from {title}"),
        url: None,
        year: None,
    }
}

pub fn test_config() -> Config {
    Config {
        site_password: Some(PASSWORD.to_string()),
        cookie_secret: Some("test-cookie-secret".to_string()),
        stream_flush_ms: 0,
        ..Config::default()
    }
}

/// Fresh in-memory database, fixed "today", scripted upstream
pub async fn test_state(provider: Arc<ScriptedProvider>) -> AppState {
    let pool = db::create_memory_pool().await.expect("create in-memory sqlite");
    let usage = UsageLedger::with_today(pool.clone(), fixed_today);
    AppState::with_usage(test_config(), pool, provider, usage)
}

/// Collect every event of a turn; the channel closes when the reply task ends
pub async fn drain(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
