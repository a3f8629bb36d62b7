//! Background maintenance loops.

use std::sync::Arc;

use chrono::Utc;
use glimpse_core::analytics::PurgeReport;
use tracing::{error, info};

use crate::state::AppState;

/// End every session idle for longer than the active window.
pub async fn sweep_stale_sessions_once(state: &AppState) -> anyhow::Result<usize> {
    let cutoff = Utc::now() - state.config.active_window();
    let ended = state.analytics.end_stale_sessions(cutoff).await?;
    if ended > 0 {
        info!(ended, "Stale sessions ended");
    }
    Ok(ended)
}

/// Delete events and sessions older than the retention window.
pub async fn purge_expired_once(state: &AppState) -> anyhow::Result<PurgeReport> {
    let cutoff = Utc::now() - state.config.retention_window();
    let report = state.analytics.purge_expired(cutoff).await?;
    info!(
        events = report.events,
        sessions = report.sessions,
        retention_days = state.config.retention_days,
        "Retention sweep complete"
    );
    Ok(report)
}

pub async fn run_session_sweep_loop(state: Arc<AppState>) {
    let period = state.config.session_sweep_interval();
    info!(tick_seconds = period.as_secs(), "Session sweep started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = sweep_stale_sessions_once(&state).await {
            error!(error = %err, "session sweep iteration failed");
        }
    }
}

/// The first tick completes immediately, so expired rows are purged at
/// startup before the regular cadence begins.
pub async fn run_retention_loop(state: Arc<AppState>) {
    let period = state.config.retention_sweep_interval();
    info!(tick_seconds = period.as_secs(), "Retention sweep started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = purge_expired_once(&state).await {
            error!(error = %err, "retention sweep iteration failed");
        }
    }
}
