use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::{Country, Device, ReferrerType, Region};
use crate::event::Event;

/// Rollup of one visitor's activity on one site for one day.
///
/// Keyed by `session_id`. Created by the first event carrying an unseen
/// `session_id`, updated by every later one, and ended either explicitly or
/// by the stale-session sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub visitor_id: String,
    pub site_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub pageviews: i64,
    pub events: i64,
    /// Whole seconds between `start_time` and `last_activity`.
    pub duration: i64,
    pub entry_page: String,
    pub exit_page: String,
    pub device: Device,
    pub browser: String,
    pub os: String,
    pub country: Country,
    pub region: Region,
    pub referrer: String,
    pub referrer_type: ReferrerType,
    pub is_active: bool,
}

impl Session {
    /// The row inserted for a brand-new `session_id`: the creation step and
    /// the first update folded together.
    pub fn start(event: &Event) -> Self {
        Self {
            session_id: event.session_id.clone(),
            visitor_id: event.visitor_id.clone(),
            site_id: event.site_id.clone(),
            start_time: event.timestamp,
            last_activity: event.timestamp,
            end_time: None,
            pageviews: i64::from(event.is_pageview()),
            events: 1,
            duration: 0,
            entry_page: event.page.clone(),
            exit_page: event.page.clone(),
            device: event.device,
            browser: event.browser.clone(),
            os: event.os.clone(),
            country: event.country.clone(),
            region: event.region.clone(),
            referrer: event.referrer.clone(),
            referrer_type: event.referrer_type,
            is_active: true,
        }
    }

    /// Fold a later event for the same session into the rollup.
    ///
    /// Mirrors the storage-level upsert: counters only grow, `exit_page`
    /// follows the latest event, `entry_page` is untouched, and an
    /// out-of-order (older) event never moves `last_activity` backwards.
    pub fn record(&mut self, event: &Event) {
        if event.is_pageview() {
            self.pageviews += 1;
        }
        self.events += 1;
        self.exit_page = event.page.clone();
        if event.timestamp > self.last_activity {
            self.last_activity = event.timestamp;
        }
        self.duration = self
            .duration
            .max((self.last_activity - self.start_time).num_seconds());
        self.is_active = true;
        self.end_time = None;
    }

    /// Explicit end transition.
    pub fn end(&mut self, at: DateTime<Utc>) {
        self.is_active = false;
        self.end_time = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::TrackPayload;
    use crate::context::{GeoLocation, RequestContext, UserAgentInfo};
    use crate::identity::Identity;
    use chrono::{Duration, TimeZone};

    fn event(kind: &str, page: &str, secs: i64) -> Event {
        let beacon = TrackPayload {
            event_type: Some(kind.to_string()),
            page: Some(serde_json::json!(page)),
            site_id: Some("site_test".to_string()),
            ..Default::default()
        }
        .validate()
        .expect("valid");
        let base = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        Event::new(
            beacon,
            Identity {
                visitor_id: "v1".to_string(),
                session_id: "s1".to_string(),
            },
            RequestContext {
                user_agent: UserAgentInfo::unknown(),
                geo: GeoLocation::unknown(),
                referrer_type: ReferrerType::Direct,
            },
            base + Duration::seconds(secs),
        )
    }

    #[test]
    fn start_counts_first_event() {
        let s = Session::start(&event("pageview", "/a", 0));
        assert_eq!((s.pageviews, s.events, s.duration), (1, 1, 0));
        assert_eq!(s.entry_page, "/a");
        assert!(s.is_active);

        let s = Session::start(&event("click", "/a", 0));
        assert_eq!((s.pageviews, s.events), (0, 1));
    }

    #[test]
    fn record_advances_exit_page_and_duration() {
        let mut s = Session::start(&event("pageview", "/a", 0));
        s.record(&event("pageview", "/b", 42));
        assert_eq!((s.pageviews, s.events, s.duration), (2, 2, 42));
        assert_eq!(s.entry_page, "/a");
        assert_eq!(s.exit_page, "/b");
        assert!(s.pageviews <= s.events);
    }

    #[test]
    fn out_of_order_event_never_shrinks_duration() {
        let mut s = Session::start(&event("pageview", "/a", 0));
        s.record(&event("pageview", "/b", 60));
        s.record(&event("click", "/c", 10));
        assert_eq!(s.duration, 60);
        assert_eq!(s.exit_page, "/c");
    }

    #[test]
    fn end_then_record_reactivates() {
        let mut s = Session::start(&event("pageview", "/a", 0));
        let at = s.last_activity;
        s.end(at);
        assert!(!s.is_active);
        assert_eq!(s.end_time, Some(at));
        s.record(&event("pageview", "/b", 5));
        assert!(s.is_active);
        assert_eq!(s.end_time, None);
    }
}
