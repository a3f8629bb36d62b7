use thiserror::Error;

/// Caller-correctable input failures.
///
/// Raised while validating a beacon or a dashboard query; the server maps
/// every variant to HTTP 400 and surfaces the message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("eventType must be one of: pageview, click, custom, session_start, session_end (got {0:?})")]
    InvalidEventType(String),

    #[error("siteId must match ^[A-Za-z0-9_-]{{3,50}}$")]
    InvalidSiteId,

    #[error("page must be a string")]
    PageNotString,

    #[error("page must be at most {max} characters")]
    PageTooLong { max: usize },

    #[error("customData must serialize to at most {max} bytes")]
    CustomDataTooLarge { max: usize },

    #[error("invalid {field}: expected RFC 3339 timestamp or YYYY-MM-DD")]
    InvalidDate { field: &'static str },

    #[error("startDate must be on or before endDate")]
    InvertedDateRange,

    #[error("interval must be one of: hour, day, week, month")]
    InvalidInterval,

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("malformed query string: {0}")]
    MalformedQuery(String),
}
