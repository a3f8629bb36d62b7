pub mod active;
pub mod breakdown;
pub mod overview;
pub mod timeseries;

use glimpse_core::analytics::QueryRange;

use crate::backend::sql_ts;

/// The three leading parameters every range-scoped query binds as
/// `?1` (site), `?2` (inclusive start) and `?3` (exclusive end).
pub(crate) fn range_params(
    site_id: &str,
    range: &QueryRange,
) -> Vec<Box<dyn duckdb::types::ToSql>> {
    vec![
        Box::new(site_id.to_string()),
        Box::new(sql_ts(range.start)),
        Box::new(sql_ts(range.end)),
    ]
}
