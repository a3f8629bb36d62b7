use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    /// `"ok"` or `"unreachable"`.
    pub storage: &'static str,
    /// `"enabled"` or `"disabled"`. A disabled resolver still serves traffic;
    /// every event is attributed to `Unknown`.
    pub geoip: &'static str,
}

/// `GET /health`
///
/// Only the storage ping decides the status code (`200` / `503`). Running
/// without a GeoIP database is a supported setup and is reported, not failed.
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let storage_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check: event store unreachable");
            false
        }
    };

    let report = HealthReport {
        status: if storage_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        storage: if storage_ok { "ok" } else { "unreachable" },
        geoip: if state.geo.is_enabled() {
            "enabled"
        } else {
            "disabled"
        },
    };
    let code = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}
