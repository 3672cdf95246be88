// src/store/types.rs
// Record types for conversations, messages and usage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Title given to every new conversation until its first message arrives
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Messages allowed per session per UTC day
pub const DAILY_MESSAGE_LIMIT: i64 = 25;

/// Answer style, selecting one of the two system prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Standard,
    #[serde(alias = "scholastic_disputation", alias = "scholastic-disputation")]
    Aquinas,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Standard => "standard",
            Mode::Aquinas => "aquinas",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Standard => "Standard Mode",
            Mode::Aquinas => "Aquinas Mode",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Mode::Standard),
            "aquinas" | "scholastic_disputation" | "scholastic-disputation" => Ok(Mode::Aquinas),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Source reference attached to an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    /// Excerpt of the cited text
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: String,
    pub session_id: String,
    pub title: String,
    pub mode: Mode,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    pub created_at: i64,
}

/// Today's usage for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub count: i64,
    pub limit: i64,
    pub remaining: i64,
}

impl UsageSummary {
    pub fn from_count(count: i64) -> Self {
        Self {
            count,
            limit: DAILY_MESSAGE_LIMIT,
            remaining: DAILY_MESSAGE_LIMIT - count,
        }
    }

    pub fn can_send(&self) -> bool {
        self.count < self.limit
    }
}

/// Title derived from the first user message
pub fn title_from_message(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() > 50 {
        let head: String = trimmed.chars().take(50).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}
