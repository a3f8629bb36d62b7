use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::backend::sql_ts;
use crate::DuckDbBackend;

/// Sessions with activity after `since`. Derived from recency alone; the
/// `is_active` flag is not consulted.
pub async fn count_active_sessions_inner(
    db: &DuckDbBackend,
    site_id: &str,
    since: DateTime<Utc>,
) -> Result<i64> {
    let conn = db.conn.lock().await;
    let count: i64 = conn
        .prepare(
            "SELECT COUNT(*) FROM sessions \
             WHERE site_id = ?1 AND last_activity > ?2",
        )?
        .query_row(duckdb::params![site_id, sql_ts(since)], |row| row.get(0))?;
    Ok(count)
}
