// src/config/mod.rs
// Runtime configuration, read from the environment (and `.env`)

use std::str::FromStr;
use tracing::Level;

use crate::db::default_database_url;

pub const DEFAULT_MAGISTERIUM_BASE_URL: &str = "https://www.magisterium.com/api/v1";
pub const DEFAULT_MAGISTERIUM_MODEL: &str = "magisterium-1";

#[derive(Debug, Clone)]
pub struct Config {
    // ── Server
    pub host: String,
    pub port: u16,

    // ── Database
    pub database_url: String,

    // ── Access control
    pub site_password: Option<String>,
    pub cookie_secret: Option<String>,
    pub cookie_secure: bool,

    // ── Upstream model
    pub magisterium_base_url: String,
    pub magisterium_api_key: Option<String>,
    pub magisterium_model: String,
    pub upstream_timeout_secs: u64,
    pub stream_flush_ms: u64,

    // ── Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: default_database_url(),
            site_password: None,
            cookie_secret: None,
            cookie_secure: false,
            magisterium_base_url: DEFAULT_MAGISTERIUM_BASE_URL.to_string(),
            magisterium_api_key: None,
            magisterium_model: DEFAULT_MAGISTERIUM_MODEL.to_string(),
            upstream_timeout_secs: 300,
            stream_flush_ms: 750,
            log_level: "info".to_string(),
        }
    }
}

/// Strip an inline `# comment` and surrounding whitespace
fn clean(value: &str) -> &str {
    value.split('#').next().unwrap_or("").trim()
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|val| clean(&val).parse::<T>().ok()).unwrap_or(default)
}

fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok(), default)
}

/// Secrets may legitimately contain `#`, so they are only trimmed
fn env_secret(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| clean(&v).to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load `.env` if present, then read every setting from the environment
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            host: env_string("QUAESTIO_HOST").unwrap_or(defaults.host),
            port: env_var_or("QUAESTIO_PORT", defaults.port),
            database_url: env_string("DATABASE_URL").unwrap_or(defaults.database_url),
            site_password: env_secret("SITE_PASSWORD"),
            cookie_secret: env_secret("QUAESTIO_COOKIE_SECRET"),
            cookie_secure: env_var_or("QUAESTIO_COOKIE_SECURE", defaults.cookie_secure),
            magisterium_base_url: env_string("MAGISTERIUM_BASE_URL")
                .unwrap_or(defaults.magisterium_base_url),
            magisterium_api_key: env_secret("MAGISTERIUM_API_KEY"),
            magisterium_model: env_string("MAGISTERIUM_MODEL").unwrap_or(defaults.magisterium_model),
            upstream_timeout_secs: env_var_or("QUAESTIO_UPSTREAM_TIMEOUT", defaults.upstream_timeout_secs),
            stream_flush_ms: env_var_or("QUAESTIO_STREAM_FLUSH_MS", defaults.stream_flush_ms),
            log_level: env_string("QUAESTIO_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tracing_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}
