// src/session.rs
// Anonymous session identity, persisted in a browser cookie

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::convert::Infallible;
use tracing::{debug, warn};

use crate::auth::cookie_value;

pub const SESSION_COOKIE: &str = "quaestio-session-id";

/// ~400 days, the longest lifetime browsers honour
const SESSION_MAX_AGE_SECS: i64 = 400 * 24 * 60 * 60;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client-generated pseudo-identity used instead of accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `session_<unix ms>_<13 random base36 chars>`. No formal collision
/// resistance beyond the random suffix.
pub fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let suffix: String = (0..13)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    SessionId(format!(
        "session_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        suffix
    ))
}

fn is_valid(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Existing id from the request cookies, or a fresh one. The flag is
/// true when the id was just generated and still needs persisting.
pub fn get_or_create_session_id(headers: &HeaderMap) -> (SessionId, bool) {
    match cookie_value(headers, SESSION_COOKIE) {
        Some(value) if is_valid(&value) => (SessionId(value), false),
        Some(_) => {
            warn!("Discarding malformed session cookie");
            (generate_session_id(), true)
        }
        None => (generate_session_id(), true),
    }
}

pub fn session_cookie(id: &SessionId, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Lax",
        id.as_str()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Resolve the session for every request and persist new ids on the way out
pub async fn session_layer(secure: bool, mut req: Request, next: Next) -> Response {
    let (id, created) = get_or_create_session_id(req.headers());
    req.extensions_mut().insert(id.clone());

    let mut response = next.run(req).await;

    if created {
        debug!("Issued new session {}", id);
        if let Ok(value) = HeaderValue::from_str(&session_cookie(&id, secure)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<SessionId>() {
            return Ok(id.clone());
        }
        // Outside the layer the id cannot be persisted, but reads still work
        Ok(get_or_create_session_id(&parts.headers).0)
    }
}
