//! SQLite cache of retrieved sessions
//!
//! Read-through store keyed by (year, round, session kind). Entries are never
//! invalidated by the pipeline; `podium cache clear` is the only eviction.

use crate::data::source::Session;
use crate::{Result, SessionKey};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Cache connection and operations
pub struct SessionCache {
    conn: Connection,
}

/// Summary of cache contents
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub session_count: usize,
    pub event_count: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl SessionCache {
    /// Open or create the cache at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let cache = SessionCache { conn };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = SessionCache { conn };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                year INTEGER NOT NULL,
                round INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (year, round, kind)
            );
            "#,
        )?;
        Ok(())
    }

    /// Look up a cached session
    pub fn get(&self, key: SessionKey) -> Result<Option<Session>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM sessions WHERE year = ?1 AND round = ?2 AND kind = ?3",
                params![key.event.year, key.event.round, key.kind.code()],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => {
                let session: Session = serde_json::from_str(&json)?;
                log::debug!("Cache hit: {}", key);
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Store a session, replacing any earlier copy
    pub fn put(&self, session: &Session) -> Result<()> {
        let payload = serde_json::to_string(session)?;
        self.conn.execute(
            r#"
            INSERT INTO sessions (year, round, kind, payload, fetched_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(year, round, kind) DO UPDATE SET
                payload = excluded.payload,
                fetched_at = excluded.fetched_at
            "#,
            params![
                session.key.event.year,
                session.key.event.round,
                session.key.kind.code(),
                payload,
                Utc::now().to_rfc3339(),
            ],
        )?;
        log::debug!("Cached {}", session.key);
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let session_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        let event_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT year, round FROM sessions)",
            [],
            |row| row.get(0),
        )?;
        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(fetched_at), MAX(fetched_at) FROM sessions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let parse = |s: Option<String>| {
            s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };

        Ok(CacheStats {
            session_count: session_count as usize,
            event_count: event_count as usize,
            oldest: parse(oldest),
            newest: parse(newest),
        })
    }

    /// Remove every cached session, returning how many were deleted
    pub fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM sessions", [])?;
        Ok(removed)
    }
}
