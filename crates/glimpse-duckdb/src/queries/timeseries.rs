use anyhow::Result;
use chrono::SecondsFormat;

use glimpse_core::analytics::{Interval, QueryRange, TimeseriesPoint};

use crate::backend::from_epoch_ms;
use crate::queries::range_params;
use crate::DuckDbBackend;

/// Pageviews and distinct visitors per bucket, ascending, empty buckets
/// omitted. `date_trunc('week', ..)` starts weeks on ISO Monday.
pub async fn get_timeseries_inner(
    db: &DuckDbBackend,
    site_id: &str,
    range: &QueryRange,
    interval: Interval,
) -> Result<Vec<TimeseriesPoint>> {
    let conn = db.conn.lock().await;

    // `interval` is a closed enum, so interpolating its name is safe.
    let sql = format!(
        r#"
        SELECT
            epoch_ms(CAST(date_trunc('{unit}', created_at) AS TIMESTAMP)) AS bucket,
            COUNT(*) AS pageviews,
            COUNT(DISTINCT visitor_id) AS visitors
        FROM events
        WHERE site_id = ?1
          AND created_at >= ?2
          AND created_at < ?3
          AND event_type = 'pageview'
        GROUP BY bucket
        ORDER BY bucket ASC
        "#,
        unit = interval.as_str(),
    );

    let params = range_params(site_id, range);
    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        let bucket_ms: i64 = row.get(0)?;
        let pageviews: i64 = row.get(1)?;
        let visitors: i64 = row.get(2)?;
        Ok((bucket_ms, pageviews, visitors))
    })?;

    let mut series = Vec::new();
    for row in rows {
        let (bucket_ms, pageviews, visitors) = row?;
        series.push(TimeseriesPoint {
            bucket: from_epoch_ms(bucket_ms)?.to_rfc3339_opts(SecondsFormat::Secs, true),
            pageviews,
            visitors,
        });
    }
    Ok(series)
}
