//! Database module for search history
//!
//! Provides persistence for completed searches and the hotels each one showed.

mod schema;

pub use schema::*;

use crate::state_machine::UserId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Could not create database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Search Log Operations ====================

    /// Append a completed search and its hotels in one transaction
    pub fn append_search(&self, entry: &SearchLogEntry) -> DbResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO searches (user_id, created_at, city_name, scenario)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.user_id.0,
                entry.created_at.to_rfc3339(),
                entry.city_name,
                entry.scenario.command(),
            ],
        )?;
        let search_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO search_hotels (search_id, position, hotel_name) VALUES (?1, ?2, ?3)",
            )?;
            for (position, name) in entry.hotel_names.iter().enumerate() {
                let position = i64::try_from(position).unwrap_or(i64::MAX);
                stmt.execute(params![search_id, position, name])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Most recent history rows for a user, newest search first.
    /// `limit` counts joined rows, one per shown hotel.
    pub fn recent_entries(&self, user_id: UserId, limit: usize) -> DbResult<Vec<HistoryRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.scenario, s.created_at, h.hotel_name
             FROM searches s
             LEFT JOIN search_hotels h ON h.search_id = s.id
             WHERE s.user_id = ?1
             ORDER BY s.created_at DESC, s.id DESC, h.position ASC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user_id.0, limit], |row| {
            Ok(HistoryRow {
                scenario: row.get(0)?,
                created_at: parse_datetime(&row.get::<_, String>(1)?),
                hotel_name: row.get(2)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Distinct cities a user searched, most recently searched first
    pub fn recent_cities(&self, user_id: UserId, limit: usize) -> DbResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT city_name
             FROM searches
             WHERE user_id = ?1 AND city_name != ''
             GROUP BY city_name
             ORDER BY MAX(created_at) DESC
             LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user_id.0, limit], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
