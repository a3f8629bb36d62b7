use std::sync::Arc;

use glimpse_core::{
    analytics::AnalyticsBackend, config::Config, context::GeoResolver, identity::IdentityHasher,
};
use glimpse_duckdb::DuckDbBackend;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Concrete backend, kept for health checks.
    pub db: Arc<DuckDbBackend>,

    /// The same backend behind the storage trait. Ingestion, queries and the
    /// background sweeps all go through this.
    pub analytics: Arc<dyn AnalyticsBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    pub hasher: Arc<IdentityHasher>,

    /// GeoIP lookups. Disabled (every lookup `Unknown`) when no database is
    /// configured.
    pub geo: Arc<GeoResolver>,
}

impl AppState {
    /// Construct state with GeoIP disabled; see [`AppState::with_geo`].
    pub fn new(db: DuckDbBackend, config: Config, hasher: IdentityHasher) -> Self {
        let db = Arc::new(db);
        Self {
            analytics: db.clone(),
            db,
            config: Arc::new(config),
            hasher: Arc::new(hasher),
            geo: Arc::new(GeoResolver::disabled()),
        }
    }

    pub fn with_geo(mut self, geo: GeoResolver) -> Self {
        self.geo = Arc::new(geo);
        self
    }
}
