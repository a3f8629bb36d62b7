use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use glimpse_core::{beacon::TrackPayload, error::ValidationError};

use crate::{
    client::{ClientInfo, PeerAddr},
    error::AppError,
    ingest::ingest,
    state::AppState,
};

/// `POST /track` — ingest one beacon.
///
/// ## Auth
/// None. The tracking script runs on third-party pages.
///
/// ## Enrichment
/// - `visitorId` / `sessionId`: salted SHA-256 of client IP and user agent
///   (plus the UTC date for sessions). The raw IP is never stored.
/// - device, browser, OS via `woothee`; country/region via GeoIP.
/// - `referrerType` against the page host, `Origin`, or `Host`.
///
/// ## Response
/// `201 Created` with `{ "success": true }`, after both the event write and
/// the session update have completed.
#[tracing::instrument(skip_all)]
pub async fn track(
    State(state): State<Arc<AppState>>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
    payload: Result<Json<TrackPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| ValidationError::MalformedBody(e.body_text()))?;
    let beacon = payload.validate()?;

    let client = ClientInfo::from_request(&headers, peer, beacon.page_host.as_deref());
    ingest(&state, beacon, &client, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}
