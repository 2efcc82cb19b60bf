//! Database schema and types

use crate::state_machine::{Scenario, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS searches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    city_name TEXT NOT NULL,
    scenario TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_searches_user ON searches(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS search_hotels (
    search_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    hotel_name TEXT NOT NULL,

    PRIMARY KEY (search_id, position),
    FOREIGN KEY (search_id) REFERENCES searches(id) ON DELETE CASCADE
);
";

/// A completed search, as logged when its results were presented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLogEntry {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub city_name: String,
    pub scenario: Scenario,
    /// In presented order
    pub hotel_names: Vec<String>,
}

/// One history line: a logged search joined with one of its hotels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    /// The command that started the search, e.g. `/lowprice`
    pub scenario: String,
    pub created_at: DateTime<Utc>,
    /// `None` for a search that found nothing
    pub hotel_name: Option<String>,
}
