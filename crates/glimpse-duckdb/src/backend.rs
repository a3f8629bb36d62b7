use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use glimpse_core::event::Event;

use crate::schema::init_sql;

/// Generate a cryptographically random hex string of `n` bytes (2n hex chars).
pub(crate) fn rand_hex(n: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Render a timestamp in the form DuckDB casts implicitly to `TIMESTAMP`.
pub(crate) fn sql_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Decode the output of `epoch_ms(<timestamp column>)`.
pub(crate) fn from_epoch_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {ms}"))
}

/// A DuckDB backend for glimpse.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. The connection is wrapped in `Arc<Mutex<_>>` so every
/// statement is serialised while the struct stays cheap to share across
/// axum handlers.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Creates all tables and indexes if they do not already exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        Self::seed_settings_sync(&conn)?;
        info!(path, memory_limit, "DuckDB opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests only — data is discarded when the struct is
    /// dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Self::seed_settings_sync(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Seed the `settings` table. `INSERT OR IGNORE` keeps re-runs on every
    /// startup from rotating the hash secret.
    fn seed_settings_sync(conn: &Connection) -> Result<()> {
        let secret = rand_hex(32);
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('hash_secret', ?1)",
            duckdb::params![secret],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('version', ?1)",
            duckdb::params!["1"],
        )?;
        Ok(())
    }

    /// Read the persisted hashing secret.
    pub async fn hash_secret(&self) -> Result<String> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = 'hash_secret'")?;
        let secret: String = stmt.query_row([], |row| row.get(0))?;
        Ok(secret)
    }

    /// Append one enriched event.
    pub async fn insert_event(&self, event: &Event) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO events (
                id, site_id, event_type, page, title, referrer, referrer_type,
                session_id, visitor_id,
                device, browser, os, screen_width, screen_height, language,
                country, region, custom_data, created_at
            ) VALUES (
                ?1,  ?2,  ?3,  ?4,  ?5,  ?6,  ?7,
                ?8,  ?9,
                ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19
            )"#,
            duckdb::params![
                event.id,
                event.site_id,
                event.event_type.as_str(),
                event.page,
                event.title,
                event.referrer,
                event.referrer_type.as_str(),
                event.session_id,
                event.visitor_id,
                event.device.as_str(),
                event.browser,
                event.os,
                i64::from(event.screen_width),
                i64::from(event.screen_height),
                event.language,
                event.country.as_str(),
                event.region.as_str(),
                event.custom_data.as_ref().map(|d| d.to_json()),
                sql_ts(event.timestamp),
            ],
        )?;
        tracing::debug!(site_id = %event.site_id, event_type = %event.event_type, "Event stored");
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    /// Production code should use the typed methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
