//! # Article Logs
//!
//! Append-only interaction records plus the JSON payloads exchanged with clients.
//!
//! ## Records
//! - One row per click and one row per reading ping
//! - Rows are never updated or deleted
//! - `id` and `created_at` are assigned by the store on insert
//!
//! ## Reading Time
//! The frontend sends a reading ping every [`READING_PING_SECONDS`] while an article stays open.
//! Total reading time is a proxy: pings multiplied by that interval, no real elapsed time.
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const READING_PING_SECONDS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Click,
    Reading,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Reading => "reading",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(Action::Click),
            "reading" => Ok(Action::Reading),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// A record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticleLog {
    pub user_id: String,
    pub article_id: String,
    pub action: Action,
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleLog {
    pub id: i64,
    pub user_id: String,
    pub article_id: String,
    pub action: Action,
    pub created_at: DateTime<Utc>,
}

/// Body of both write endpoints.
///
/// Fields are optional so that an absent field and an empty one are rejected the same way.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub article_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserArticlesResponse {
    pub article_ids: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingTimeResponse {
    pub article_id: String,
    pub reading_time_sec: u64,
    pub reading_time_min: u64,
    pub interaction_count: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
