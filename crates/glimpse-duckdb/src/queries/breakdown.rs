use anyhow::Result;

use glimpse_core::analytics::{BreakdownRow, Dimension, QueryRange};

use crate::queries::range_params;
use crate::DuckDbBackend;

/// Column and extra predicate for each dimension. Only static SQL fragments
/// are returned; user input is always bound.
fn dimension_sql(dimension: Dimension) -> (&'static str, &'static str) {
    match dimension {
        Dimension::Pages => ("page", ""),
        Dimension::Referrers => ("referrer", " AND referrer_type = 'external'"),
        Dimension::Devices => ("device", ""),
        Dimension::Browsers => ("browser", ""),
        Dimension::Countries => ("country", " AND country <> 'Unknown'"),
    }
}

pub async fn get_breakdown_inner(
    db: &DuckDbBackend,
    site_id: &str,
    range: &QueryRange,
    dimension: Dimension,
    limit: i64,
) -> Result<Vec<BreakdownRow>> {
    let conn = db.conn.lock().await;
    let (column, extra_filter) = dimension_sql(dimension);

    let sql = format!(
        r#"
        SELECT
            {column} AS dim_value,
            COUNT(*) AS pageviews,
            COUNT(DISTINCT visitor_id) AS visitors
        FROM events
        WHERE site_id = ?1
          AND created_at >= ?2
          AND created_at < ?3
          AND event_type = 'pageview'
          {extra_filter}
        GROUP BY dim_value
        ORDER BY pageviews DESC, dim_value ASC
        LIMIT ?4
        "#
    );

    let mut params = range_params(site_id, range);
    params.push(Box::new(limit));
    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(BreakdownRow {
            value: row.get(0)?,
            pageviews: row.get(1)?,
            visitors: row.get(2)?,
        })
    })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}
