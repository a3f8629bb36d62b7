use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::beacon::Beacon;
use crate::context::{Country, Device, ReferrerType, Region, RequestContext};
use crate::error::ValidationError;
use crate::identity::Identity;

/// The five kinds of tracked occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Pageview,
    Click,
    Custom,
    SessionStart,
    SessionEnd,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Pageview => "pageview",
            EventType::Click => "click",
            EventType::Custom => "custom",
            EventType::SessionStart => "session_start",
            EventType::SessionEnd => "session_end",
        }
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pageview" => Ok(EventType::Pageview),
            "click" => Ok(EventType::Click),
            "custom" => Ok(EventType::Custom),
            "session_start" => Ok(EventType::SessionStart),
            "session_end" => Ok(EventType::SessionEnd),
            other => Err(ValidationError::InvalidEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema-less key/value bag attached to `custom` events.
///
/// Only the serialized size is checked; the contents are stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomData(pub serde_json::Map<String, serde_json::Value>);

impl CustomData {
    pub fn to_json(&self) -> String {
        serde_json::Value::Object(self.0.clone()).to_string()
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str::<serde_json::Value>(raw).ok()? {
            serde_json::Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

/// The enriched, stored event. Mirrors the `events` table columns.
///
/// Immutable once built: the store appends it and never updates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub site_id: String,
    pub event_type: EventType,
    pub page: String,
    pub title: String,
    pub referrer: String,
    pub referrer_type: ReferrerType,
    pub session_id: String,
    pub visitor_id: String,
    pub device: Device,
    pub browser: String,
    pub os: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub language: String,
    pub country: Country,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Assemble an event from a validated beacon and the derived context.
    pub fn new(
        beacon: Beacon,
        identity: Identity,
        context: RequestContext,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            site_id: beacon.site_id,
            event_type: beacon.event_type,
            page: beacon.page,
            title: beacon.title,
            referrer: beacon.referrer,
            referrer_type: context.referrer_type,
            session_id: identity.session_id,
            visitor_id: identity.visitor_id,
            device: context.user_agent.device,
            browser: context.user_agent.browser,
            os: context.user_agent.os,
            screen_width: beacon.screen_width,
            screen_height: beacon.screen_height,
            language: beacon.language,
            country: context.geo.country,
            region: context.geo.region,
            custom_data: beacon.custom_data,
            timestamp,
        }
    }

    pub fn is_pageview(&self) -> bool {
        self.event_type == EventType::Pageview
    }
}
