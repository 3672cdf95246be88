// tests/magisterium.rs
// Magisterium client against a local event-stream server

use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use futures::StreamExt;
use std::time::Duration;

use quaestio::llm::{ChatMessage, ChatProvider, ChatRequest, GatewayError, MagisteriumClient, StreamChunk};
use quaestio::store::{Mode, Role};

const AVE: &str = r#"{"choices":[{"delta":{"content":"Ave "}}]}"#;
const MARIA: &str = r#"{"choices":[{"delta":{"content":"Maria"}}]}"#;
const CITED: &str = r#"{"choices":[{"delta":{}}],"citations":[{"cited_text":"Ave gratia plena","document_title":"Luke 1:28"}]}"#;

fn event_stream(body: Vec<u8>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/event-stream")], body)
}

async fn well_formed() -> impl IntoResponse {
    event_stream(format!("data: {AVE}\n\ndata: {MARIA}\n\ndata: {CITED}\n\ndata: [DONE]\n\n").into_bytes())
}

async fn garbled() -> impl IntoResponse {
    let mut body = format!("data: {AVE}\n\n").into_bytes();
    body.extend_from_slice(b"data: a\xFFb\n\n");
    body.extend_from_slice(b"data: {\"choices\":[{\"delta\":{\"content\":\"third\"}}]}\n\n");
    event_stream(body)
}

async fn overloaded() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

/// Serve the fake upstream on an ephemeral port and return its base url
async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/ok/chat/completions", post(well_formed))
        .route("/garbled/chat/completions", post(garbled))
        .route("/down/chat/completions", post(overloaded));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String) -> MagisteriumClient {
    MagisteriumClient::new(base_url, Some("test-key".into()), "magisterium-1", Duration::from_secs(5)).unwrap()
}

fn question() -> ChatRequest {
    ChatRequest {
        mode: Mode::Standard,
        messages: vec![ChatMessage {
            role: Role::User,
            content: "What is the Angelus?".into(),
        }],
    }
}

async fn collect(client: &MagisteriumClient) -> Vec<Result<StreamChunk, GatewayError>> {
    let stream = client.stream_chat(question()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), stream.collect::<Vec<_>>())
        .await
        .expect("stream did not terminate")
}

#[tokio::test]
async fn text_arrives_before_citations() {
    let base = spawn_upstream().await;
    let items = collect(&client(format!("{base}/ok"))).await;

    let chunks: Vec<StreamChunk> = items.into_iter().map(|i| i.unwrap()).collect();
    assert_eq!(chunks[0], StreamChunk::Text("Ave ".into()));
    assert_eq!(chunks[1], StreamChunk::Text("Maria".into()));
    match &chunks[2] {
        StreamChunk::Citations(list) => {
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].title, "Luke 1:28");
        }
        other => panic!("expected citations, got {other:?}"),
    }
    assert_eq!(chunks.len(), 3);
}

#[tokio::test]
async fn invalid_bytes_end_the_stream_with_an_error() {
    let base = spawn_upstream().await;
    let items = collect(&client(format!("{base}/garbled"))).await;

    assert!(matches!(items.last(), Some(Err(_))));
    assert!(
        !items
            .iter()
            .any(|i| matches!(i, Ok(StreamChunk::Text(t)) if t == "third"))
    );
}

#[tokio::test]
async fn rejected_request_fails_before_streaming() {
    let base = spawn_upstream().await;
    let result = client(format!("{base}/down")).stream_chat(question()).await;

    match result {
        Err(GatewayError::Upstream { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("a 503 should not open a stream"),
    }
}
