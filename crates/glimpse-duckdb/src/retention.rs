use anyhow::Result;
use chrono::{DateTime, Utc};

use glimpse_core::analytics::PurgeReport;

use crate::backend::sql_ts;
use crate::DuckDbBackend;

/// Delete events created and sessions started before `cutoff`.
///
/// Both deletes run in one transaction so aggregates never observe a
/// session whose events are already gone, or the reverse.
pub(crate) async fn purge_expired_inner(
    db: &DuckDbBackend,
    cutoff: DateTime<Utc>,
) -> Result<PurgeReport> {
    let mut conn = db.conn.lock().await;
    let cutoff_str = sql_ts(cutoff);

    let tx = conn.transaction()?;
    let events = tx.execute(
        "DELETE FROM events WHERE created_at < ?1",
        duckdb::params![cutoff_str],
    )?;
    let sessions = tx.execute(
        "DELETE FROM sessions WHERE start_time < ?1",
        duckdb::params![cutoff_str],
    )?;
    tx.commit()?;

    Ok(PurgeReport { events, sessions })
}
