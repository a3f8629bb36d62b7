use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use glimpse_core::{
    analytics::{clamp_limit, DashboardResult, Dimension, Interval, QueryRange},
    beacon::is_valid_site_id,
    error::ValidationError,
};

use crate::{error::AppError, state::AppState};

/// Query string shared by every `/api/stats/*` endpoint. Each handler reads
/// only the fields it needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub site_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub interval: Option<String>,
    pub limit: Option<i64>,
}

impl StatsQuery {
    fn site_id(&self) -> Result<&str, ValidationError> {
        let site_id = self
            .site_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingField("siteId"))?;
        if !is_valid_site_id(site_id) {
            return Err(ValidationError::InvalidSiteId);
        }
        Ok(site_id)
    }

    fn range(&self) -> Result<QueryRange, ValidationError> {
        QueryRange::parse(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            Utc::now(),
        )
    }
}

type StatsQueryResult = Result<Query<StatsQuery>, QueryRejection>;

fn parse_query(query: StatsQueryResult) -> Result<StatsQuery, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ValidationError::MalformedQuery(e.body_text()).into())
}

/// `{ success: true, data, dateRange: { start, end } }`
fn envelope<T: Serialize>(data: T, range: &QueryRange) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
        "dateRange": {
            "start": range.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "end": range.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    }))
}

/// `GET /api/stats/overview`
#[tracing::instrument(skip_all)]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    let query = parse_query(query)?;
    let site_id = query.site_id()?;
    let range = query.range()?;

    let result = state.analytics.get_overview(site_id, &range).await?;
    Ok(envelope(result, &range))
}

/// `GET /api/stats/timeseries`
#[tracing::instrument(skip_all)]
pub async fn timeseries(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    let query = parse_query(query)?;
    let site_id = query.site_id()?;
    let range = query.range()?;
    let interval = Interval::parse_opt(query.interval.as_deref())?;

    let series = state
        .analytics
        .get_timeseries(site_id, &range, interval)
        .await?;
    Ok(envelope(series, &range))
}

async fn breakdown(
    state: &AppState,
    query: StatsQueryResult,
    dimension: Dimension,
) -> Result<Json<Value>, AppError> {
    let query = parse_query(query)?;
    let site_id = query.site_id()?;
    let range = query.range()?;
    let limit = clamp_limit(query.limit);

    let rows = state
        .analytics
        .get_breakdown(site_id, &range, dimension, limit)
        .await?;
    Ok(envelope(rows, &range))
}

/// `GET /api/stats/pages`
#[tracing::instrument(skip_all)]
pub async fn pages(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    breakdown(&state, query, Dimension::Pages).await
}

/// `GET /api/stats/referrers` — external referrers only.
#[tracing::instrument(skip_all)]
pub async fn referrers(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    breakdown(&state, query, Dimension::Referrers).await
}

/// `GET /api/stats/devices`
#[tracing::instrument(skip_all)]
pub async fn devices(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    breakdown(&state, query, Dimension::Devices).await
}

/// `GET /api/stats/browsers`
#[tracing::instrument(skip_all)]
pub async fn browsers(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    breakdown(&state, query, Dimension::Browsers).await
}

/// `GET /api/stats/countries` — the `Unknown` bucket is omitted.
#[tracing::instrument(skip_all)]
pub async fn countries(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    breakdown(&state, query, Dimension::Countries).await
}

/// `GET /api/stats/active` — sessions with activity inside the configured
/// active window. Not range-scoped, so no `dateRange` is returned.
#[tracing::instrument(skip_all)]
pub async fn active(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    let query = parse_query(query)?;
    let site_id = query.site_id()?;
    let since = Utc::now() - state.config.active_window();

    let active_sessions = state
        .analytics
        .count_active_sessions(site_id, since)
        .await?;
    Ok(Json(json!({
        "success": true,
        "data": { "activeSessions": active_sessions },
    })))
}

/// `GET /api/stats/dashboard` — overview, every breakdown and the active
/// session count in one response.
///
/// Sub-queries run concurrently; the first failure fails the whole request.
#[tracing::instrument(skip_all)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    query: StatsQueryResult,
) -> Result<impl IntoResponse, AppError> {
    let query = parse_query(query)?;
    let site_id = query.site_id()?;
    let range = query.range()?;
    let limit = clamp_limit(query.limit);
    let since = Utc::now() - state.config.active_window();
    let analytics = &state.analytics;

    let (overview, top_pages, top_referrers, devices, browsers, countries, active_sessions) =
        tokio::try_join!(
            analytics.get_overview(site_id, &range),
            analytics.get_breakdown(site_id, &range, Dimension::Pages, limit),
            analytics.get_breakdown(site_id, &range, Dimension::Referrers, limit),
            analytics.get_breakdown(site_id, &range, Dimension::Devices, limit),
            analytics.get_breakdown(site_id, &range, Dimension::Browsers, limit),
            analytics.get_breakdown(site_id, &range, Dimension::Countries, limit),
            analytics.count_active_sessions(site_id, since),
        )?;

    let result = DashboardResult {
        overview,
        top_pages,
        top_referrers,
        devices,
        browsers,
        countries,
        active_sessions,
    };
    Ok(envelope(result, &range))
}
