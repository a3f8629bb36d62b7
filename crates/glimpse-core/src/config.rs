use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub geoip_path: String,
    /// Hashing secret for visitor/session IDs. When `None`, a secret is
    /// generated once and persisted by the storage backend.
    pub hash_secret: Option<String>,
    pub retention_days: u32,
    /// Trailing window, in minutes, within which a session counts as active.
    pub active_window_minutes: u32,
    pub session_sweep_interval_secs: u64,
    pub retention_sweep_interval_secs: u64,
    pub cors_origins: Vec<String>,
    pub duckdb_memory_limit: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: "./data".to_string(),
            geoip_path: "./GeoLite2-City.mmdb".to_string(),
            hash_secret: None,
            retention_days: 90,
            active_window_minutes: 30,
            session_sweep_interval_secs: 60,
            retention_sweep_interval_secs: 3600,
            cors_origins: Vec::new(),
            duckdb_memory_limit: "1GB".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            port: std::env::var("GLIMPSE_PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("GLIMPSE_DATA_DIR").unwrap_or(defaults.data_dir),
            geoip_path: std::env::var("GLIMPSE_GEOIP_PATH").unwrap_or(defaults.geoip_path),
            hash_secret: std::env::var("GLIMPSE_HASH_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            retention_days: env_or("GLIMPSE_RETENTION_DAYS", defaults.retention_days),
            active_window_minutes: env_or(
                "GLIMPSE_ACTIVE_WINDOW_MINUTES",
                defaults.active_window_minutes,
            ),
            session_sweep_interval_secs: env_or(
                "GLIMPSE_SESSION_SWEEP_SECONDS",
                defaults.session_sweep_interval_secs,
            ),
            retention_sweep_interval_secs: env_or(
                "GLIMPSE_RETENTION_SWEEP_SECONDS",
                defaults.retention_sweep_interval_secs,
            ),
            cors_origins: std::env::var("GLIMPSE_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            duckdb_memory_limit: std::env::var("GLIMPSE_DUCKDB_MEMORY")
                .unwrap_or(defaults.duckdb_memory_limit),
        })
    }

    pub fn active_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.active_window_minutes))
    }

    pub fn retention_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_interval_secs.max(1))
    }
}

/// Parse an env var, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
