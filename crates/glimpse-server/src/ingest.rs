use chrono::{DateTime, Utc};

use glimpse_core::{
    beacon::Beacon,
    context::classify,
    event::Event,
    identity::anonymize_ip,
    session::Session,
};

use crate::{client::ClientInfo, state::AppState};

/// Turn a validated beacon into a stored event and its updated session.
///
/// The event write completes before the session is stitched; a failure in
/// either step is returned to the caller.
#[tracing::instrument(
    skip_all,
    fields(
        site_id = %beacon.site_id,
        event_type = %beacon.event_type,
        ip = %anonymize_ip(&client.ip)
    )
)]
pub async fn ingest(
    state: &AppState,
    beacon: Beacon,
    client: &ClientInfo,
    now: DateTime<Utc>,
) -> anyhow::Result<Session> {
    let identity = state.hasher.identify(&client.ip, &client.user_agent, now);
    let context = classify(
        &state.geo,
        &client.ip,
        &client.user_agent,
        &beacon.referrer,
        &client.site_host,
    );

    let event = Event::new(beacon, identity, context, now);
    state.analytics.insert_event(&event).await?;
    let session = state.analytics.stitch_session(&event).await?;

    tracing::debug!(
        session_pageviews = session.pageviews,
        session_events = session.events,
        "Beacon ingested"
    );
    Ok(session)
}
