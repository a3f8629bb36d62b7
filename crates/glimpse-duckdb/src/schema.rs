/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `GLIMPSE_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit: the DuckDB default (80% of system RAM) is not acceptable for a
/// server process.
///
/// Both `events.created_at` and `sessions.start_time` are the expiry anchors
/// for the retention sweep (see `retention.rs`); DuckDB has no TTL index.
///
/// Columns the session upsert rewrites (`last_activity`, counters,
/// `exit_page`, `is_active`) are deliberately left out of every index.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS
-- ===========================================
-- Keys stored in this table:
--   'hash_secret' – 32-byte random hex mixed into visitor/session hashes
--                   (unused when GLIMPSE_HASH_SECRET is set)
--   'version'     – Database schema version
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- SESSIONS (derived, upserted on each event)
-- ===========================================
-- One row per (site_id, session_id); the session hash carries no site, so
-- the site is part of the key. The stitcher writes it with a single
-- INSERT ... ON CONFLICT DO UPDATE so concurrent first events for the same
-- session collapse into one row instead of racing.
CREATE TABLE IF NOT EXISTS sessions (
    session_id      VARCHAR NOT NULL,
    visitor_id      VARCHAR NOT NULL,
    site_id         VARCHAR NOT NULL,
    start_time      TIMESTAMP NOT NULL,
    last_activity   TIMESTAMP NOT NULL,
    end_time        TIMESTAMP,                     -- NULL while active
    pageviews       BIGINT NOT NULL DEFAULT 0,
    events          BIGINT NOT NULL DEFAULT 0,
    duration        BIGINT NOT NULL DEFAULT 0,     -- seconds
    entry_page      VARCHAR NOT NULL,              -- set once at creation
    exit_page       VARCHAR NOT NULL,
    device          VARCHAR NOT NULL,              -- 'desktop' | 'mobile' | 'tablet' | 'unknown'
    browser         VARCHAR NOT NULL,
    os              VARCHAR NOT NULL,
    country         VARCHAR NOT NULL,              -- ISO 3166-1 alpha-2 or 'Unknown'
    region          VARCHAR NOT NULL,
    referrer        VARCHAR NOT NULL,
    referrer_type   VARCHAR NOT NULL,              -- 'external' | 'internal' | 'none' | 'direct'
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    PRIMARY KEY (site_id, session_id)
);
-- Overview queries select sessions by start time; retention deletes by it.
CREATE INDEX IF NOT EXISTS idx_sessions_site_start
    ON sessions(site_id, start_time);

-- ===========================================
-- EVENTS (append-only)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR NOT NULL,              -- UUID v4
    site_id         VARCHAR NOT NULL,
    event_type      VARCHAR NOT NULL,              -- pageview | click | custom | session_start | session_end
    page            VARCHAR NOT NULL,
    title           VARCHAR NOT NULL,
    referrer        VARCHAR NOT NULL,
    referrer_type   VARCHAR NOT NULL,
    session_id      VARCHAR NOT NULL,
    visitor_id      VARCHAR NOT NULL,

    device          VARCHAR NOT NULL,
    browser         VARCHAR NOT NULL,
    os              VARCHAR NOT NULL,
    screen_width    INTEGER NOT NULL DEFAULT 0,
    screen_height   INTEGER NOT NULL DEFAULT 0,
    language        VARCHAR NOT NULL,

    country         VARCHAR NOT NULL,
    region          VARCHAR NOT NULL,

    custom_data     VARCHAR,                       -- JSON object, custom events only

    created_at      TIMESTAMP NOT NULL
);

-- Primary query pattern: site + date range
CREATE INDEX IF NOT EXISTS idx_events_site_time
    ON events(site_id, created_at);

-- Pageview-only aggregations (time series, breakdowns)
CREATE INDEX IF NOT EXISTS idx_events_site_type_time
    ON events(site_id, event_type, created_at);

-- Per-session lookups
CREATE INDEX IF NOT EXISTS idx_events_session
    ON events(session_id);
"#
    )
}
