//! Presentation layer: server-rendered pages plus one embedded script.
//!
//! Pages read straight from the stores; every mutation goes through the
//! JSON API so the page script and any other client behave the same.

pub mod assets;
pub mod markdown;
pub mod pages;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::error;

use crate::session::SessionId;
use crate::state::AppState;
use crate::store::StoreError;

pub fn web_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login))
        .route("/chat/{id}", get(chat))
        .route("/share/{token}", get(shared))
        .route("/static/{file}", get(assets::static_handler))
        .route("/favicon.ico", get(assets::favicon_handler))
        .fallback(not_found)
}

fn error_page(e: StoreError) -> Response {
    error!("Page render failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(pages::not_found_page("Something went wrong. Please try again.")),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    from: Option<String>,
}

/// Only same-site paths are allowed as a post-login destination
fn safe_destination(from: Option<String>) -> String {
    match from {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/".to_string(),
    }
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<LoginQuery>,
) -> Response {
    let from = safe_destination(q.from);
    if state.auth.is_authenticated(&headers) {
        return Redirect::to(&from).into_response();
    }
    Html(pages::login_page(&from)).into_response()
}

async fn home(State(state): State<AppState>, session: SessionId) -> Response {
    match state.conversations.list(session.as_str()).await {
        Ok(conversations) => Html(pages::home_page(&conversations)).into_response(),
        Err(e) => error_page(e),
    }
}

async fn chat(State(state): State<AppState>, session: SessionId, Path(id): Path<String>) -> Response {
    let conversation = match state.conversations.get_owned(&id, session.as_str()).await {
        Ok(c) => c,
        Err(StoreError::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Html(pages::not_found_page("This conversation may have been deleted.")),
            )
                .into_response();
        }
        Err(e) => return error_page(e),
    };

    let loaded = async {
        let messages = state.messages.list(&id).await?;
        let conversations = state.conversations.list(session.as_str()).await?;
        let usage = state.usage.get_today_usage(session.as_str()).await?;
        Ok::<_, StoreError>((messages, conversations, usage))
    }
    .await;

    match loaded {
        Ok((messages, conversations, usage)) => {
            Html(pages::chat_page(&conversation, &messages, &conversations, usage)).into_response()
        }
        Err(e) => error_page(e),
    }
}

async fn shared(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let conversation = match state.conversations.get_by_share_token(&token).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Html(pages::not_found_page(
                    "This conversation may have been deleted or is no longer shared.",
                )),
            )
                .into_response();
        }
        Err(e) => return error_page(e),
    };

    match state.messages.list(&conversation.id).await {
        Ok(messages) => Html(pages::share_page(&conversation, &messages)).into_response(),
        Err(e) => error_page(e),
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(pages::not_found_page("The page you were looking for does not exist.")),
    )
        .into_response()
}
