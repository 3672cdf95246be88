// src/lib.rs
// Quaestio - Catholic theological Q&A over the Magisterium API

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod events;
pub mod llm;
pub mod router;
pub mod session;
pub mod state;
pub mod store;
pub mod web;

pub use router::create_router;
pub use state::AppState;
