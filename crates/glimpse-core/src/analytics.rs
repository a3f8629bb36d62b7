//! Analytics backend abstraction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::ValidationError;
use crate::event::Event;
use crate::session::Session;

pub const DEFAULT_RANGE_DAYS: i64 = 30;
pub const DEFAULT_BREAKDOWN_LIMIT: i64 = 10;
pub const MAX_BREAKDOWN_LIMIT: i64 = 100;

/// Half-open time range `[start, end)` every aggregation is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange);
        }
        Ok(Self { start, end })
    }

    /// Resolve optional `startDate` / `endDate` query parameters.
    ///
    /// Each accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date. A
    /// date-only `end` covers that whole day. Missing bounds default to the
    /// last [`DEFAULT_RANGE_DAYS`] days ending at `now`.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let end = match end.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_bound(raw, "endDate", true)?,
            None => now,
        };
        let start = match start.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_bound(raw, "startDate", false)?,
            None => end - Duration::days(DEFAULT_RANGE_DAYS),
        };
        Self::new(start, end)
    }
}

fn parse_bound(
    raw: &str,
    field: &'static str,
    is_end: bool,
) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate { field })?;
    let date = if is_end {
        date.succ_opt().ok_or(ValidationError::InvalidDate { field })?
    } else {
        date
    };
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Time-series bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
        }
    }

    /// `None` or empty selects the default (`day`).
    pub fn parse_opt(raw: Option<&str>) -> Result<Self, ValidationError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Interval::Hour),
            "day" => Ok(Interval::Day),
            "week" => Ok(Interval::Week),
            "month" => Ok(Interval::Month),
            _ => Err(ValidationError::InvalidInterval),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimensions available for top-N breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Pages,
    /// External referrers only.
    Referrers,
    Devices,
    Browsers,
    /// Excludes the `Unknown` country.
    Countries,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Pages,
        Dimension::Referrers,
        Dimension::Devices,
        Dimension::Browsers,
        Dimension::Countries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Pages => "pages",
            Dimension::Referrers => "referrers",
            Dimension::Devices => "devices",
            Dimension::Browsers => "browsers",
            Dimension::Countries => "countries",
        }
    }
}

/// Clamp a requested breakdown size to `1..=MAX_BREAKDOWN_LIMIT`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_BREAKDOWN_LIMIT)
        .clamp(1, MAX_BREAKDOWN_LIMIT)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResult {
    pub pageviews: i64,
    pub unique_visitors: i64,
    pub sessions: i64,
    /// Whole seconds.
    pub avg_duration: i64,
    /// Integer percentage, 0–100.
    pub bounce_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeseriesPoint {
    /// RFC 3339 UTC start of the bucket.
    pub bucket: String,
    pub pageviews: i64,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
    pub value: String,
    pub pageviews: i64,
    pub visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResult {
    pub overview: OverviewResult,
    pub top_pages: Vec<BreakdownRow>,
    pub top_referrers: Vec<BreakdownRow>,
    pub devices: Vec<BreakdownRow>,
    pub browsers: Vec<BreakdownRow>,
    pub countries: Vec<BreakdownRow>,
    pub active_sessions: i64,
}

/// Rows removed by one retention pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PurgeReport {
    pub events: usize,
    pub sessions: usize,
}

#[async_trait::async_trait]
pub trait AnalyticsBackend: Send + Sync + 'static {
    /// Append one event. Events are never updated afterwards.
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()>;

    /// Create-or-advance the session `(event.site_id, event.session_id)` in
    /// one atomic step and return the resulting rollup.
    async fn stitch_session(&self, event: &Event) -> anyhow::Result<Session>;

    async fn get_session(
        &self,
        site_id: &str,
        session_id: &str,
    ) -> anyhow::Result<Option<Session>>;

    /// Explicit end transition. Returns `false` if the session does not exist
    /// or has already ended.
    async fn end_session(
        &self,
        site_id: &str,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// End every active session whose last activity is older than `cutoff`.
    async fn end_stale_sessions(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize>;

    async fn get_overview(
        &self,
        site_id: &str,
        range: &QueryRange,
    ) -> anyhow::Result<OverviewResult>;

    async fn get_timeseries(
        &self,
        site_id: &str,
        range: &QueryRange,
        interval: Interval,
    ) -> anyhow::Result<Vec<TimeseriesPoint>>;

    async fn get_breakdown(
        &self,
        site_id: &str,
        range: &QueryRange,
        dimension: Dimension,
        limit: i64,
    ) -> anyhow::Result<Vec<BreakdownRow>>;

    /// Sessions whose last activity is after `since`.
    async fn count_active_sessions(
        &self,
        site_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64>;

    /// Delete events and sessions created before `cutoff`.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<PurgeReport>;
}
