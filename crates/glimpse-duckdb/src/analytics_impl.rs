use async_trait::async_trait;
use chrono::{DateTime, Utc};

use glimpse_core::analytics::{
    AnalyticsBackend, BreakdownRow, Dimension, Interval, OverviewResult, PurgeReport, QueryRange,
    TimeseriesPoint,
};
use glimpse_core::event::Event;
use glimpse_core::session::Session;

use crate::DuckDbBackend;

#[async_trait]
impl AnalyticsBackend for DuckDbBackend {
    async fn insert_event(&self, event: &Event) -> anyhow::Result<()> {
        DuckDbBackend::insert_event(self, event).await
    }

    async fn stitch_session(&self, event: &Event) -> anyhow::Result<Session> {
        crate::session::stitch_session_inner(self, event).await
    }

    async fn get_session(
        &self,
        site_id: &str,
        session_id: &str,
    ) -> anyhow::Result<Option<Session>> {
        crate::session::get_session_inner(self, site_id, session_id).await
    }

    async fn end_session(
        &self,
        site_id: &str,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        crate::session::end_session_inner(self, site_id, session_id, at).await
    }

    async fn end_stale_sessions(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize> {
        crate::session::end_stale_sessions_inner(self, cutoff).await
    }

    async fn get_overview(
        &self,
        site_id: &str,
        range: &QueryRange,
    ) -> anyhow::Result<OverviewResult> {
        crate::queries::overview::get_overview_inner(self, site_id, range).await
    }

    async fn get_timeseries(
        &self,
        site_id: &str,
        range: &QueryRange,
        interval: Interval,
    ) -> anyhow::Result<Vec<TimeseriesPoint>> {
        crate::queries::timeseries::get_timeseries_inner(self, site_id, range, interval).await
    }

    async fn get_breakdown(
        &self,
        site_id: &str,
        range: &QueryRange,
        dimension: Dimension,
        limit: i64,
    ) -> anyhow::Result<Vec<BreakdownRow>> {
        crate::queries::breakdown::get_breakdown_inner(self, site_id, range, dimension, limit)
            .await
    }

    async fn count_active_sessions(
        &self,
        site_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        crate::queries::active::count_active_sessions_inner(self, site_id, since).await
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<PurgeReport> {
        crate::retention::purge_expired_inner(self, cutoff).await
    }
}
