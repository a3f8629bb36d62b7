use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — the tracking script is embedded on third-party sites, so
///    `/track` must answer cross-origin requests. Restricted to
///    `GLIMPSE_CORS_ORIGINS` when set.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/track", post(routes::track::track))
        .route("/api/stats/overview", get(routes::stats::overview))
        .route("/api/stats/timeseries", get(routes::stats::timeseries))
        .route("/api/stats/pages", get(routes::stats::pages))
        .route("/api/stats/referrers", get(routes::stats::referrers))
        .route("/api/stats/devices", get(routes::stats::devices))
        .route("/api/stats/browsers", get(routes::stats::browsers))
        .route("/api/stats/countries", get(routes::stats::countries))
        .route("/api/stats/active", get(routes::stats::active))
        .route("/api/stats/dashboard", get(routes::stats::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
