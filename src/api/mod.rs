// src/api/mod.rs
// JSON and SSE endpoints under /api

pub mod error;
pub mod http;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use http::router::api_router;
