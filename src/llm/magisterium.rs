// src/llm/magisterium.rs
// OpenAI-compatible streaming client for the Magisterium API

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{ChatProvider, ChatRequest, ChatStream, GatewayError, StreamChunk, system_prompt};
use crate::config::Config;
use crate::store::Citation;

/// Citation as returned by the provider, at the top level of the final chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MagisteriumCitation {
    #[serde(default)]
    pub cited_text: Option<String>,
    #[serde(default)]
    pub cited_text_heading: Option<String>,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub document_author: Option<String>,
    #[serde(default)]
    pub document_year: Option<String>,
    #[serde(default)]
    pub document_reference: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MagisteriumCitation> for Citation {
    fn from(c: MagisteriumCitation) -> Self {
        let title = non_empty(c.document_title)
            .or_else(|| non_empty(c.cited_text_heading))
            .or_else(|| non_empty(c.document_reference))
            .unwrap_or_else(|| "Untitled source".to_string());

        Citation {
            title,
            source: c.cited_text.unwrap_or_default(),
            url: non_empty(c.source_url),
            year: non_empty(c.document_year),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    citations: Option<Vec<MagisteriumCitation>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// What one SSE payload contributed to the reply
#[derive(Debug, Default, PartialEq)]
struct ParsedChunk {
    text: String,
    citations: Option<Vec<Citation>>,
    done: bool,
}

fn parse_payload(data: &str) -> Result<ParsedChunk, GatewayError> {
    if data.trim() == "[DONE]" {
        return Ok(ParsedChunk { done: true, ..Default::default() });
    }

    let chunk: CompletionChunk = serde_json::from_str(data).map_err(|e| {
        GatewayError::Stream(format!(
            "unparseable chunk ({e}): {:?}",
            data.chars().take(100).collect::<String>()
        ))
    })?;

    if let Some(err) = chunk.error {
        return Err(GatewayError::Stream(err.to_string()));
    }

    let text = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .collect::<String>();

    Ok(ParsedChunk {
        text,
        citations: chunk
            .citations
            .map(|list| list.into_iter().map(Citation::from).collect()),
        done: false,
    })
}

#[derive(Clone)]
pub struct MagisteriumClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl MagisteriumClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        Self::new(
            config.magisterium_base_url.clone(),
            config.magisterium_api_key.clone(),
            config.magisterium_model.clone(),
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(json!({ "role": "system", "content": system_prompt(request.mode) }));
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        json!({
            "model": self.model,
            "stream": true,
            "messages": messages,
        })
    }
}

/// Map an event-source failure, reading the body of a rejected request
async fn gateway_error(e: EventSourceError) -> GatewayError {
    match e {
        EventSourceError::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_else(|_| "<no body>".into());
            GatewayError::Upstream {
                status: status.as_u16(),
                body,
            }
        }
        EventSourceError::Transport(e) => GatewayError::Request(e),
        other => GatewayError::Stream(other.to_string()),
    }
}

#[async_trait]
impl ChatProvider for MagisteriumClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::NotConfigured)?;

        info!(
            "Streaming {} messages to {} ({} mode)",
            request.messages.len(),
            self.model,
            request.mode
        );

        let request_builder = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&self.request_body(&request));

        let mut es = EventSource::new(request_builder)
            .map_err(|e| GatewayError::Stream(format!("Failed to create EventSource: {e}")))?;

        // Wait for the connection so a rejected request fails the call itself
        match es.next().await {
            Some(Ok(_)) => debug!("Magisterium SSE connection opened"),
            Some(Err(e)) => {
                es.close();
                let err = gateway_error(e).await;
                error!("Magisterium API error: {}", err);
                return Err(err);
            }
            None => return Err(GatewayError::Stream("stream closed before opening".into())),
        }

        let stream = async_stream::stream! {
            let mut citations: Option<Vec<Citation>> = None;

            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(msg)) => match parse_payload(&msg.data) {
                        Ok(parsed) if parsed.done => {
                            debug!("Stream completed: [DONE] marker received");
                            break;
                        }
                        Ok(parsed) => {
                            if parsed.citations.is_some() {
                                citations = parsed.citations;
                            }
                            if !parsed.text.is_empty() {
                                yield Ok(StreamChunk::Text(parsed.text));
                            }
                        }
                        Err(e) => {
                            warn!("{}", e);
                            es.close();
                            yield Err(e);
                            return;
                        }
                    },
                    Err(EventSourceError::StreamEnded) => break,
                    Err(e) => {
                        es.close();
                        let err = gateway_error(e).await;
                        error!("Stream error: {}", err);
                        yield Err(err);
                        return;
                    }
                }
            }
            es.close();

            if let Some(list) = citations.filter(|l| !l.is_empty()) {
                debug!("Upstream returned {} citations", list.len());
                yield Ok(StreamChunk::Citations(list));
            }
        };

        Ok(Box::pin(stream))
    }
}
