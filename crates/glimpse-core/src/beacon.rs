//! Validation and sanitization of inbound `/track` payloads.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;
use crate::event::{CustomData, EventType};

pub const MAX_PAGE_LEN: usize = 500;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_REFERRER_LEN: usize = 500;
pub const MAX_LANGUAGE_LEN: usize = 10;
pub const MAX_SITE_ID_LEN: usize = 50;
pub const MIN_SITE_ID_LEN: usize = 3;
pub const MAX_CUSTOM_DATA_BYTES: usize = 4096;

/// The JSON body the tracking script sends to `POST /track`.
///
/// Loosely typed on purpose: `page`, the screen dimensions and `customData`
/// are accepted as any JSON value so that [`TrackPayload::validate`] can
/// report a precise error, coerce them, or drop them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    pub event_type: Option<String>,
    pub page: Option<Value>,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub language: Option<String>,
    pub screen_width: Option<Value>,
    pub screen_height: Option<Value>,
    pub site_id: Option<String>,
    pub custom_data: Option<Value>,
}

/// A validated, sanitized beacon, ready to be enriched into an
/// [`Event`](crate::event::Event).
#[derive(Debug, Clone, PartialEq)]
pub struct Beacon {
    pub site_id: String,
    pub event_type: EventType,
    /// Always a path starting with `/`.
    pub page: String,
    /// Host of `page` when the client sent a full URL.
    pub page_host: Option<String>,
    pub title: String,
    pub referrer: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub custom_data: Option<CustomData>,
}

impl TrackPayload {
    pub fn validate(self) -> Result<Beacon, ValidationError> {
        let raw_type =
            non_empty(self.event_type).ok_or(ValidationError::MissingField("eventType"))?;
        let raw_page = self.page.ok_or(ValidationError::MissingField("page"))?;
        let site_id = non_empty(self.site_id).ok_or(ValidationError::MissingField("siteId"))?;

        let event_type: EventType = raw_type.parse()?;

        let page = match raw_page {
            Value::String(s) => s,
            Value::Null => return Err(ValidationError::MissingField("page")),
            _ => return Err(ValidationError::PageNotString),
        };
        if page.chars().count() > MAX_PAGE_LEN {
            return Err(ValidationError::PageTooLong { max: MAX_PAGE_LEN });
        }

        if !is_valid_site_id(&site_id) {
            return Err(ValidationError::InvalidSiteId);
        }

        // Only objects on custom events are kept; anything else is dropped.
        let custom_data = match (event_type, self.custom_data) {
            (EventType::Custom, Some(Value::Object(map))) => {
                let data = CustomData(map);
                if data.to_json().len() > MAX_CUSTOM_DATA_BYTES {
                    return Err(ValidationError::CustomDataTooLarge {
                        max: MAX_CUSTOM_DATA_BYTES,
                    });
                }
                Some(data)
            }
            _ => None,
        };

        let (page, page_host) = normalize_page(&page);

        Ok(Beacon {
            site_id: clamp(&site_id, MAX_SITE_ID_LEN),
            event_type,
            page,
            page_host,
            title: clamp(self.title.as_deref().unwrap_or_default().trim(), MAX_TITLE_LEN),
            referrer: clamp(
                self.referrer.as_deref().unwrap_or_default().trim(),
                MAX_REFERRER_LEN,
            ),
            language: clamp(
                self.language.as_deref().unwrap_or_default().trim(),
                MAX_LANGUAGE_LEN,
            ),
            screen_width: coerce_dimension(self.screen_width.as_ref()),
            screen_height: coerce_dimension(self.screen_height.as_ref()),
            custom_data,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// `^[A-Za-z0-9_-]{3,50}$`
pub fn is_valid_site_id(site_id: &str) -> bool {
    (MIN_SITE_ID_LEN..=MAX_SITE_ID_LEN).contains(&site_id.len())
        && site_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Truncate to at most `max` characters (not bytes).
pub fn clamp(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Non-negative integer, or 0 when the value is missing, negative or not a
/// number. Numeric strings (`"1920"`) and floats (`1920.7`) are accepted.
pub fn coerce_dimension(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => v.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Reduce `page` to a path, returning the URL host as well when a full URL
/// was supplied.
pub fn normalize_page(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return ("/".to_string(), None);
    }

    if raw.contains("://") {
        return match Url::parse(raw) {
            Ok(url) if url.host_str().is_some() => {
                let host = url.host_str().map(str::to_ascii_lowercase);
                let path = url.path();
                let path = if path.is_empty() { "/" } else { path };
                (path.to_string(), host)
            }
            _ => ("/".to_string(), None),
        };
    }

    if raw.starts_with('/') {
        (raw.to_string(), None)
    } else {
        (format!("/{raw}"), None)
    }
}
