use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;

use glimpse_core::context::{Country, Device, ReferrerType, Region};
use glimpse_core::event::Event;
use glimpse_core::session::Session;

use crate::backend::{from_epoch_ms, sql_ts};
use crate::DuckDbBackend;

const SESSION_COLUMNS: &str = "session_id, visitor_id, site_id, \
     epoch_ms(start_time), epoch_ms(last_activity), epoch_ms(end_time), \
     pageviews, events, duration, entry_page, exit_page, \
     device, browser, os, country, region, referrer, referrer_type, is_active";

/// Create-or-advance the session for `event` in one statement.
///
/// Rows are keyed by `(site_id, session_id)`: the session hash does not
/// include the site, so the same visitor on two sites gets two rows.
///
/// The insert branch carries [`Session::start`]; the conflict branch applies
/// the same increments as [`Session::record`]. Running both as a single
/// `INSERT ... ON CONFLICT DO UPDATE` means two first events for an unseen
/// session can never produce two rows or a constraint failure.
pub(crate) async fn stitch_session_inner(db: &DuckDbBackend, event: &Event) -> Result<Session> {
    let start = Session::start(event);
    let conn = db.conn.lock().await;

    conn.execute(
        "INSERT INTO sessions (
            session_id, visitor_id, site_id, start_time, last_activity, end_time,
            pageviews, events, duration, entry_page, exit_page,
            device, browser, os, country, region, referrer, referrer_type, is_active
         ) VALUES (
            ?1, ?2, ?3, ?4, ?5, NULL,
            ?6, ?7, 0, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14, ?15, ?16, TRUE
         )
         ON CONFLICT (site_id, session_id) DO UPDATE SET
            pageviews     = sessions.pageviews + EXCLUDED.pageviews,
            events        = sessions.events + EXCLUDED.events,
            exit_page     = EXCLUDED.exit_page,
            last_activity = GREATEST(sessions.last_activity, EXCLUDED.last_activity),
            duration      = GREATEST(
                                sessions.duration,
                                (epoch_ms(GREATEST(sessions.last_activity, EXCLUDED.last_activity))
                                    - epoch_ms(sessions.start_time)) // 1000
                            ),
            end_time      = NULL,
            is_active     = TRUE",
        duckdb::params![
            start.session_id,
            start.visitor_id,
            start.site_id,
            sql_ts(start.start_time),
            sql_ts(start.last_activity),
            start.pageviews,
            start.events,
            start.entry_page,
            start.exit_page,
            start.device.as_str(),
            start.browser,
            start.os,
            start.country.as_str(),
            start.region.as_str(),
            start.referrer,
            start.referrer_type.as_str(),
        ],
    )?;

    read_session(&conn, &event.site_id, &event.session_id)?
        .ok_or_else(|| anyhow::anyhow!("session {} missing after upsert", event.session_id))
}

pub(crate) async fn get_session_inner(
    db: &DuckDbBackend,
    site_id: &str,
    session_id: &str,
) -> Result<Option<Session>> {
    let conn = db.conn.lock().await;
    read_session(&conn, site_id, session_id)
}

/// End one session. `exit_page` already holds the last page seen, so ending
/// only flips the activity flag and stamps `end_time`.
pub(crate) async fn end_session_inner(
    db: &DuckDbBackend,
    site_id: &str,
    session_id: &str,
    at: DateTime<Utc>,
) -> Result<bool> {
    let conn = db.conn.lock().await;
    let changed = conn.execute(
        "UPDATE sessions SET is_active = FALSE, end_time = ?3 \
         WHERE site_id = ?1 AND session_id = ?2 AND is_active",
        duckdb::params![site_id, session_id, sql_ts(at)],
    )?;
    Ok(changed > 0)
}

/// End every active session idle since before `cutoff`, stamping
/// `end_time = last_activity`.
pub(crate) async fn end_stale_sessions_inner(
    db: &DuckDbBackend,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let conn = db.conn.lock().await;
    let changed = conn.execute(
        "UPDATE sessions SET is_active = FALSE, end_time = last_activity \
         WHERE is_active AND last_activity < ?1",
        duckdb::params![sql_ts(cutoff)],
    )?;
    Ok(changed)
}

fn read_session(conn: &Connection, site_id: &str, session_id: &str) -> Result<Option<Session>> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE site_id = ?1 AND session_id = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(duckdb::params![site_id, session_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let start_ms: i64 = row.get(3)?;
    let last_ms: i64 = row.get(4)?;
    let end_ms: Option<i64> = row.get(5)?;
    let device: String = row.get(11)?;
    let country: String = row.get(14)?;
    let region: String = row.get(15)?;
    let referrer_type: String = row.get(17)?;

    Ok(Some(Session {
        session_id: row.get(0)?,
        visitor_id: row.get(1)?,
        site_id: row.get(2)?,
        start_time: from_epoch_ms(start_ms)?,
        last_activity: from_epoch_ms(last_ms)?,
        end_time: end_ms.map(from_epoch_ms).transpose()?,
        pageviews: row.get(6)?,
        events: row.get(7)?,
        duration: row.get(8)?,
        entry_page: row.get(9)?,
        exit_page: row.get(10)?,
        device: Device::from_db(&device),
        browser: row.get(12)?,
        os: row.get(13)?,
        country: Country::from(country),
        region: Region::from(region),
        referrer: row.get(16)?,
        referrer_type: ReferrerType::from_db(&referrer_type),
        is_active: row.get(18)?,
    }))
}
