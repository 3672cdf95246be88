// src/store/usage.rs
// Per-session, per-UTC-day message counter

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{DAILY_MESSAGE_LIMIT, StoreResult, UsageSummary};

pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Clone)]
pub struct UsageLedger {
    pool: SqlitePool,
    today: fn() -> NaiveDate,
}

impl UsageLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_today(pool, utc_today)
    }

    /// Ledger with a fixed notion of "today" (tests, replays)
    pub fn with_today(pool: SqlitePool, today: fn() -> NaiveDate) -> Self {
        Self { pool, today }
    }

    fn date_key(&self) -> String {
        (self.today)().format("%Y-%m-%d").to_string()
    }

    /// Today's count; a missing record reads as zero
    pub async fn get_today_usage(&self, session_id: &str) -> StoreResult<UsageSummary> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT message_count FROM usage_records WHERE session_id = ? AND date = ?",
        )
        .bind(session_id)
        .bind(self.date_key())
        .fetch_optional(&self.pool)
        .await?;

        Ok(UsageSummary::from_count(row.map(|(c,)| c).unwrap_or(0)))
    }

    pub async fn can_send(&self, session_id: &str) -> StoreResult<bool> {
        Ok(self.get_today_usage(session_id).await?.can_send())
    }

    /// Atomically add one to today's count, creating the record on the
    /// first message of the day. Returns the new count.
    pub async fn increment(&self, session_id: &str) -> StoreResult<i64> {
        let date = self.date_key();
        let (count,): (i64,) = sqlx::query_as(
            "INSERT INTO usage_records (session_id, date, message_count) VALUES (?, ?, 1)
             ON CONFLICT (session_id, date) DO UPDATE SET message_count = message_count + 1
             RETURNING message_count",
        )
        .bind(session_id)
        .bind(&date)
        .fetch_one(&self.pool)
        .await?;

        if count == 1 {
            info!("First message of {} for session {}", date, session_id);
        } else {
            debug!("Usage for {} on {}: {}", session_id, date, count);
        }
        Ok(count)
    }

    /// Take one of today's slots if any is left, in a single statement.
    /// Returns the new count, or `None` (and writes nothing) at the limit.
    pub async fn try_consume(&self, session_id: &str) -> StoreResult<Option<i64>> {
        let date = self.date_key();
        let row: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO usage_records (session_id, date, message_count) VALUES (?, ?, 1)
             ON CONFLICT (session_id, date) DO UPDATE SET message_count = message_count + 1
             WHERE message_count < ?
             RETURNING message_count",
        )
        .bind(session_id)
        .bind(&date)
        .bind(DAILY_MESSAGE_LIMIT)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((count,)) => {
                debug!("Usage for {} on {}: {}", session_id, date, count);
                Ok(Some(count))
            }
            None => {
                info!("Session {} is at the daily limit for {}", session_id, date);
                Ok(None)
            }
        }
    }
}
