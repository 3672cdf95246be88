// src/api/http/mod.rs

pub mod auth;
pub mod chat;
pub mod conversations;
pub mod handlers;
pub mod messages;
pub mod router;
pub mod share;
