//! Persistence for conversations, messages and daily usage.
//!
//! Every store wraps the same `SqlitePool`. Mutations publish a
//! [`ChangeEvent`](crate::events::ChangeEvent) so subscribers can follow a
//! conversation without polling.

mod conversations;
mod messages;
pub mod types;
mod usage;

pub use conversations::ConversationStore;
pub use messages::MessageStore;
pub use types::*;
pub use usage::{UsageLedger, utc_today};

use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Absent and soft-deleted records are reported identically
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("could not allocate a unique share token")]
    ShareTokenExhausted,
}

pub type StoreResult<T> = Result<T, StoreError>;

static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Unix milliseconds, strictly increasing within the process.
pub fn now_millis() -> i64 {
    let wall = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = wall.max(last + 1);
        match LAST_MILLIS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(seen) => last = seen,
        }
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
