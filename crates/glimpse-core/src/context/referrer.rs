use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Where a visit came from, relative to the tracked site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferrerType {
    /// A well-formed URL on another host.
    External,
    /// Same host as the site, or one of its subdomains.
    Internal,
    /// A referrer was sent but could not be parsed as a URL.
    None,
    /// No referrer at all.
    Direct,
}

impl ReferrerType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferrerType::External => "external",
            ReferrerType::Internal => "internal",
            ReferrerType::None => "none",
            ReferrerType::Direct => "direct",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "external" => ReferrerType::External,
            "internal" => ReferrerType::Internal,
            "direct" => ReferrerType::Direct,
            _ => ReferrerType::None,
        }
    }
}

impl fmt::Display for ReferrerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify `referrer` against the tracked site's host.
///
/// `site_host` may carry a port (`example.com:8080`); it is ignored, as is
/// ASCII case. An empty `site_host` makes every parseable referrer external.
pub fn classify_referrer(referrer: &str, site_host: &str) -> ReferrerType {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return ReferrerType::Direct;
    }

    let Some(host) = referrer_host(referrer) else {
        return ReferrerType::None;
    };

    let site = normalize_host(site_host);
    if site.is_empty() {
        return ReferrerType::External;
    }

    if host == site || host.ends_with(&format!(".{site}")) {
        ReferrerType::Internal
    } else {
        ReferrerType::External
    }
}

/// Lower-cased host of an absolute URL, `None` if it has none.
pub fn referrer_host(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Strip an optional port and lower-case a `Host`-style value.
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();
    // Bracketed IPv6 literal: keep the brackets, drop any trailing port.
    let host = if let Some(end) = raw.find(']') {
        &raw[..=end]
    } else {
        raw.split(':').next().unwrap_or_default()
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}
