use anyhow::Result;

use glimpse_core::analytics::{OverviewResult, QueryRange};
use glimpse_core::metrics::{average_duration, bounce_rate};

use crate::queries::range_params;
use crate::DuckDbBackend;

/// Raw session counts for one range, before rounding.
struct SessionTotals {
    total: i64,
    single_page: i64,
    positive_duration_sum: i64,
    positive_duration_count: i64,
}

pub async fn get_overview_inner(
    db: &DuckDbBackend,
    site_id: &str,
    range: &QueryRange,
) -> Result<OverviewResult> {
    let conn = db.conn.lock().await;
    let params = range_params(site_id, range);
    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    // Unique visitors span every event type; pageviews only pageview events.
    let (pageviews, unique_visitors): (i64, i64) = conn
        .prepare(
            "SELECT \
                 COUNT(*) FILTER (WHERE event_type = 'pageview'), \
                 COUNT(DISTINCT visitor_id) \
             FROM events \
             WHERE site_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        )?
        .query_row(param_refs.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?;

    let totals = conn
        .prepare(
            "SELECT \
                 COUNT(*), \
                 COUNT(*) FILTER (WHERE pageviews = 1), \
                 CAST(COALESCE(SUM(duration) FILTER (WHERE duration > 0), 0) AS BIGINT), \
                 COUNT(*) FILTER (WHERE duration > 0) \
             FROM sessions \
             WHERE site_id = ?1 AND start_time >= ?2 AND start_time < ?3",
        )?
        .query_row(param_refs.as_slice(), |row| {
            Ok(SessionTotals {
                total: row.get(0)?,
                single_page: row.get(1)?,
                positive_duration_sum: row.get(2)?,
                positive_duration_count: row.get(3)?,
            })
        })?;

    Ok(OverviewResult {
        pageviews,
        unique_visitors,
        sessions: totals.total,
        avg_duration: average_duration(
            totals.positive_duration_sum,
            totals.positive_duration_count,
        ),
        bounce_rate: bounce_rate(totals.single_page, totals.total),
    })
}
