//! SQLite-backed record store

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use crate::error::{Error, Result};

use super::reading::Reading;
use super::store::RecordStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS readings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT NOT NULL,
    temperature REAL NOT NULL,
    humidity    REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings (timestamp);
";

/// Record store persisting readings in a SQLite database
///
/// Timestamps are stored as fixed-width RFC 3339 text so lexical order
/// matches chronological order. Queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of stored readings
    pub async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Storage("SQLite connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| Error::Storage(format!("SQLite worker failed: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn save(&self, reading: Reading) -> Result<Reading> {
        let timestamp = encode_timestamp(&reading.timestamp);
        let (temperature, humidity) = (reading.temperature, reading.humidity);

        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO readings (timestamp, temperature, humidity) VALUES (?1, ?2, ?3)",
                    params![timestamp, temperature, humidity],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::trace!(id = id, "Reading saved");
        Ok(reading.with_id(id))
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<Reading>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, temperature, humidity FROM readings
                     ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, f64>(3)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        // Newest first from the query; callers want oldest first
        rows.into_iter()
            .rev()
            .map(|(id, timestamp, temperature, humidity)| {
                Ok(Reading {
                    id: Some(id),
                    timestamp: decode_timestamp(&timestamp)?,
                    temperature,
                    humidity,
                })
            })
            .collect()
    }
}

fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("bad timestamp {:?}: {}", text, e)))
}
