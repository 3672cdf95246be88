// src/auth.rs
// Shared-password gate with an HMAC-signed cookie

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_COOKIE: &str = "quaestio-auth";
const AUTH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Server configuration error")]
    NotConfigured,

    #[error("Invalid password")]
    InvalidPassword,
}

/// Value of one cookie from the `Cookie` header(s)
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
}

#[derive(Clone)]
pub struct AuthGate {
    password: Option<String>,
    key: Vec<u8>,
    secure: bool,
}

impl AuthGate {
    /// Without a password nobody can log in. Without an explicit cookie
    /// secret the key is derived from the password, so changing the
    /// password invalidates every issued cookie.
    pub fn new(password: Option<String>, cookie_secret: Option<String>, secure: bool) -> Self {
        let password = password.filter(|p| !p.is_empty());
        let key = match (&cookie_secret, &password) {
            (Some(secret), _) if !secret.is_empty() => secret.as_bytes().to_vec(),
            (_, Some(password)) => {
                Sha256::digest(format!("quaestio-auth-cookie:{password}").as_bytes()).to_vec()
            }
            _ => Vec::new(),
        };
        Self { password, key, secure }
    }

    pub fn is_configured(&self) -> bool {
        self.password.is_some()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    fn password_matches(&self, expected: &str, provided: &str) -> bool {
        let mut mac = self.mac();
        mac.update(expected.as_bytes());
        let expected_tag = mac.finalize().into_bytes();

        let mut mac = self.mac();
        mac.update(provided.as_bytes());
        mac.verify_slice(&expected_tag).is_ok()
    }

    /// Check the password and mint a cookie value valid from `now` (unix secs)
    pub fn login(&self, provided: &str, now: i64) -> Result<String, AuthError> {
        let expected = self.password.as_deref().ok_or(AuthError::NotConfigured)?;
        if !self.password_matches(expected, provided) {
            return Err(AuthError::InvalidPassword);
        }
        Ok(self.sign(now + AUTH_MAX_AGE_SECS))
    }

    fn sign(&self, expires: i64) -> String {
        let mut mac = self.mac();
        mac.update(format!("{AUTH_COOKIE}:{expires}").as_bytes());
        format!("{expires}.{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Signature and expiry check of a cookie value
    pub fn verify(&self, value: &str, now: i64) -> bool {
        if !self.is_configured() {
            return false;
        }
        let Some((expires, signature)) = value.split_once('.') else {
            return false;
        };
        let Ok(expires) = expires.parse::<i64>() else {
            return false;
        };
        if expires <= now {
            return false;
        }
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        let mut mac = self.mac();
        mac.update(format!("{AUTH_COOKIE}:{expires}").as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    pub fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        cookie_value(headers, AUTH_COOKIE)
            .map(|v| self.verify(&v, chrono::Utc::now().timestamp()))
            .unwrap_or(false)
    }

    pub fn set_cookie(&self, value: &str) -> String {
        let mut cookie = format!(
            "{AUTH_COOKIE}={value}; Path=/; Max-Age={AUTH_MAX_AGE_SECS}; HttpOnly; SameSite=Lax"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        format!("{AUTH_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
    }
}

/// How a path is treated by the gate
#[derive(Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Api,
    Page,
}

pub fn classify(path: &str) -> Access {
    const PUBLIC_API: &[&str] = &["/api/auth", "/api/logout", "/api/health"];

    if path.starts_with("/api/") || path == "/api" {
        if PUBLIC_API.contains(&path) || path.starts_with("/api/share/") {
            return Access::Public;
        }
        return Access::Api;
    }
    if path == "/login"
        || path.starts_with("/share/")
        || path.starts_with("/static/")
        || path.starts_with("/favicon")
        || path.contains('.')
    {
        return Access::Public;
    }
    Access::Page
}

/// Pages redirect to the login form, API calls get a 401
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let access = classify(&path);

    if access == Access::Public || state.auth.is_authenticated(req.headers()) {
        return next.run(req).await;
    }

    match access {
        Access::Api => {
            debug!("Rejected unauthenticated API call to {}", path);
            ApiError::unauthorized("Authentication required").into_response()
        }
        _ => {
            if !state.auth.is_configured() {
                warn!("SITE_PASSWORD is not set; every page redirects to /login");
            }
            let target = format!("/login?from={}", urlencoding::encode(&path));
            Redirect::to(&target).into_response()
        }
    }
}
