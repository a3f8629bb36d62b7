use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use glimpse_core::{
    analytics::AnalyticsBackend,
    context::{Country, Device, ReferrerType, Region},
    event::{Event, EventType},
    session::Session,
};
use glimpse_duckdb::DuckDbBackend;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
}

fn event(session_id: &str, event_type: EventType, page: &str, at: DateTime<Utc>) -> Event {
    Event {
        id: uuid::Uuid::new_v4().to_string(),
        site_id: "site_1".to_string(),
        event_type,
        page: page.to_string(),
        title: String::new(),
        referrer: "https://news.ycombinator.com/".to_string(),
        referrer_type: ReferrerType::External,
        session_id: session_id.to_string(),
        visitor_id: format!("visitor_{session_id}"),
        device: Device::Desktop,
        browser: "Firefox 124".to_string(),
        os: "Linux".to_string(),
        screen_width: 1920,
        screen_height: 1080,
        language: "en-US".to_string(),
        country: Country::Code("DE".to_string()),
        region: Region::Code("BE".to_string()),
        custom_data: None,
        timestamp: at,
    }
}

async fn ingest(db: &DuckDbBackend, event: &Event) -> Session {
    db.insert_event(event).await.expect("insert");
    AnalyticsBackend::stitch_session(db, event)
        .await
        .expect("stitch")
}

#[tokio::test]
async fn test_two_pageviews_roll_into_one_session() {
    let db = DuckDbBackend::open_in_memory().expect("db");

    ingest(&db, &event("s1", EventType::Pageview, "/", t0())).await;
    let session = ingest(
        &db,
        &event("s1", EventType::Pageview, "/pricing", t0() + Duration::seconds(90)),
    )
    .await;

    assert_eq!(session.pageviews, 2);
    assert_eq!(session.events, 2);
    assert_eq!(session.entry_page, "/");
    assert_eq!(session.exit_page, "/pricing");
    assert_eq!(session.duration, 90);
    assert_eq!(session.start_time, t0());
    assert!(session.is_active);
    assert!(session.end_time.is_none());

    let conn = db.conn_for_test().await;
    let rows: i64 = conn
        .prepare("SELECT COUNT(*) FROM sessions WHERE session_id = 's1'")
        .unwrap()
        .query_row([], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_non_pageview_counts_as_event_only() {
    let db = DuckDbBackend::open_in_memory().expect("db");

    ingest(&db, &event("s1", EventType::Pageview, "/", t0())).await;
    let session = ingest(
        &db,
        &event("s1", EventType::Click, "/", t0() + Duration::seconds(5)),
    )
    .await;

    assert_eq!(session.pageviews, 1);
    assert_eq!(session.events, 2);
    assert!(session.pageviews <= session.events);
}

#[tokio::test]
async fn test_stored_rollup_matches_in_memory_fold() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let events = vec![
        event("s1", EventType::Pageview, "/", t0()),
        event("s1", EventType::Custom, "/signup", t0() + Duration::seconds(40)),
        event("s1", EventType::Pageview, "/docs", t0() + Duration::seconds(300)),
        // Late arrival: older than the previous event.
        event("s1", EventType::Pageview, "/blog", t0() + Duration::seconds(120)),
    ];

    let mut expected = Session::start(&events[0]);
    for e in &events[1..] {
        expected.record(e);
    }

    let mut stored = None;
    for e in &events {
        stored = Some(ingest(&db, e).await);
    }
    let stored = stored.unwrap();

    assert_eq!(stored, expected);
    // Out-of-order events never shrink the session.
    assert_eq!(stored.duration, 300);
    assert_eq!(stored.last_activity, t0() + Duration::seconds(300));
    assert_eq!(stored.exit_page, "/blog");
}

#[tokio::test]
async fn test_concurrent_first_events_create_one_session() {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("db"));

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let e = event("race", EventType::Pageview, "/", t0() + Duration::seconds(i));
            db.insert_event(&e).await.expect("insert");
            AnalyticsBackend::stitch_session(db.as_ref(), &e)
                .await
                .expect("stitch")
        }));
    }
    for h in handles {
        h.await.expect("join");
    }

    let session = db.get_session("site_1", "race").await.unwrap().expect("session");
    assert_eq!(session.pageviews, 8);
    assert_eq!(session.events, 8);

    let conn = db.conn_for_test().await;
    let rows: i64 = conn
        .prepare("SELECT COUNT(*) FROM sessions")
        .unwrap()
        .query_row([], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_same_session_hash_on_two_sites_stays_separate() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let on_a = event("shared", EventType::Pageview, "/a", t0());
    let mut on_b = event("shared", EventType::Pageview, "/b", t0() + Duration::seconds(20));
    on_b.site_id = "site_2".to_string();

    ingest(&db, &on_a).await;
    let b = ingest(&db, &on_b).await;
    assert_eq!(b.site_id, "site_2");
    assert_eq!(b.pageviews, 1);
    assert_eq!(b.entry_page, "/b");

    let a = db.get_session("site_1", "shared").await.unwrap().expect("site_1");
    assert_eq!(a.pageviews, 1);
    assert_eq!(a.exit_page, "/a");
    assert_eq!(a.duration, 0);

    assert!(db.end_session("site_1", "shared", t0()).await.unwrap());
    let b = db.get_session("site_2", "shared").await.unwrap().expect("site_2");
    assert!(b.is_active);
}

#[tokio::test]
async fn test_get_session_unknown_is_none() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    assert!(db.get_session("site_1", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_end_session_is_one_shot() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    ingest(&db, &event("s1", EventType::Pageview, "/", t0())).await;

    let at = t0() + Duration::minutes(10);
    assert!(db.end_session("site_1", "s1", at).await.unwrap());
    assert!(!db.end_session("site_1", "s1", at).await.unwrap());
    assert!(!db.end_session("site_1", "missing", at).await.unwrap());

    let session = db.get_session("site_1", "s1").await.unwrap().expect("session");
    assert!(!session.is_active);
    assert_eq!(session.end_time, Some(at));
    assert_eq!(session.exit_page, "/");
}

#[tokio::test]
async fn test_stale_sweep_ends_idle_sessions_only() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    ingest(&db, &event("idle", EventType::Pageview, "/", t0())).await;
    ingest(
        &db,
        &event("busy", EventType::Pageview, "/", t0() + Duration::minutes(45)),
    )
    .await;

    let cutoff = t0() + Duration::minutes(30);
    let ended = db.end_stale_sessions(cutoff).await.unwrap();
    assert_eq!(ended, 1);

    let idle = db.get_session("site_1", "idle").await.unwrap().expect("idle");
    assert!(!idle.is_active);
    assert_eq!(idle.end_time, Some(idle.last_activity));

    let busy = db.get_session("site_1", "busy").await.unwrap().expect("busy");
    assert!(busy.is_active);

    // A second pass finds nothing new.
    assert_eq!(db.end_stale_sessions(cutoff).await.unwrap(), 0);
}

#[tokio::test]
async fn test_event_after_end_reactivates_session() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    ingest(&db, &event("s1", EventType::Pageview, "/", t0())).await;
    db.end_stale_sessions(t0() + Duration::minutes(1))
        .await
        .unwrap();

    let session = ingest(
        &db,
        &event("s1", EventType::Pageview, "/again", t0() + Duration::hours(2)),
    )
    .await;
    assert!(session.is_active);
    assert!(session.end_time.is_none());
    assert_eq!(session.pageviews, 2);
    assert_eq!(session.entry_page, "/");
    assert_eq!(session.duration, 7200);
}

#[tokio::test]
async fn test_hash_secret_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("glimpse.db");
    let path = path.to_str().expect("utf-8 path");

    let first = {
        let db = DuckDbBackend::open(path, "256MB").expect("first open");
        db.hash_secret().await.unwrap()
    };
    assert_eq!(first.len(), 64);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

    let db = DuckDbBackend::open(path, "256MB").expect("second open");
    assert_eq!(db.hash_secret().await.unwrap(), first);
}

#[tokio::test]
async fn test_custom_data_is_stored_as_json() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let mut e = event("s1", EventType::Custom, "/checkout", t0());
    let mut data = serde_json::Map::new();
    data.insert("plan".to_string(), serde_json::json!("pro"));
    e.custom_data = Some(glimpse_core::event::CustomData(data));
    db.insert_event(&e).await.unwrap();

    let conn = db.conn_for_test().await;
    let raw: String = conn
        .prepare("SELECT custom_data FROM events WHERE id = ?1")
        .unwrap()
        .query_row(glimpse_duckdb::duckdb::params![e.id], |row| row.get(0))
        .unwrap();
    let decoded = glimpse_core::event::CustomData::from_json(&raw).expect("json");
    assert_eq!(decoded.0["plan"], "pro");
}
