use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use glimpse_core::{config::Config, context::GeoResolver, identity::IdentityHasher};
use glimpse_duckdb::DuckDbBackend;
use glimpse_server::{scheduler, state::AppState};

/// `glimpse health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$GLIMPSE_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("GLIMPSE_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("glimpse=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/glimpse.db", cfg.data_dir);
    let db = DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    let secret = match &cfg.hash_secret {
        Some(secret) => {
            info!("Using hash secret from GLIMPSE_HASH_SECRET");
            secret.clone()
        }
        None => db.hash_secret().await?,
    };

    // A missing GeoIP database is not fatal: country and region fall back
    // to "Unknown".
    let geo = match GeoResolver::open(&cfg.geoip_path) {
        Ok(geo) => {
            info!(geoip_path = %cfg.geoip_path, "GeoIP database loaded");
            geo
        }
        Err(e) => {
            tracing::warn!(
                geoip_path = %cfg.geoip_path,
                error = %e,
                "GeoIP database unavailable. Events stored with Unknown country/region. \
                 Set GLIMPSE_GEOIP_PATH to a MaxMind GeoLite2-City database."
            );
            GeoResolver::disabled()
        }
    };

    let state = Arc::new(AppState::new(db, cfg.clone(), IdentityHasher::new(secret)).with_geo(geo));

    tokio::spawn(scheduler::run_session_sweep_loop(Arc::clone(&state)));
    tokio::spawn(scheduler::run_retention_loop(Arc::clone(&state)));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = glimpse_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        retention_days = cfg.retention_days,
        "Glimpse listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    info!("Shutdown complete");
    Ok(())
}
