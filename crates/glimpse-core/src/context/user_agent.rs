use std::fmt;

use serde::{Deserialize, Serialize};

/// Device class derived from the `User-Agent` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
    /// The request carried no usable user-agent.
    Unknown,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
            Device::Unknown => "unknown",
        }
    }

    /// Decode a stored column value. Anything unrecognised is `Unknown`.
    pub fn from_db(value: &str) -> Self {
        match value {
            "desktop" => Device::Desktop,
            "mobile" => Device::Mobile,
            "tablet" => Device::Tablet,
            _ => Device::Unknown,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort result of user-agent parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub device: Device,
    /// Browser name and version as free text, e.g. `"Chrome 120.0.0.0"`.
    pub browser: String,
    /// OS name and version as free text, e.g. `"Mac OSX 10.15.7"`.
    pub os: String,
}

impl UserAgentInfo {
    pub fn unknown() -> Self {
        Self {
            device: Device::Unknown,
            browser: "Unknown".to_string(),
            os: "Unknown".to_string(),
        }
    }
}

/// Parse a `User-Agent` string via `woothee`.
///
/// An empty string, or one woothee cannot parse at all, yields
/// [`UserAgentInfo::unknown`]. A parsed UA whose category is ambiguous
/// (crawler, appliance, misc, unknown) is counted as desktop.
pub fn parse_user_agent(user_agent: &str) -> UserAgentInfo {
    let user_agent = user_agent.trim();
    if user_agent.is_empty() {
        return UserAgentInfo::unknown();
    }

    let Some(result) = woothee::parser::Parser::new().parse(user_agent) else {
        return UserAgentInfo::unknown();
    };

    // woothee has no tablet category: iPads are reported as smartphones with
    // os "iPad", Android tablets as smartphones without the "Mobile" token.
    let is_tablet = result.os == "iPad"
        || user_agent.contains("iPad")
        || user_agent.contains("Tablet")
        || (user_agent.contains("Android") && !user_agent.contains("Mobile"));

    let device = match result.category {
        _ if is_tablet => Device::Tablet,
        "smartphone" | "mobilephone" => Device::Mobile,
        _ => Device::Desktop,
    };

    UserAgentInfo {
        device,
        browser: join_name_version(result.name, &result.version.to_string()),
        os: join_name_version(result.os, &result.os_version.to_string()),
    }
}

const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

/// woothee reports unknown values as `"UNKNOWN"` and missing versions as
/// `""`; normalise both.
fn join_name_version(name: &str, version: &str) -> String {
    if name.is_empty() || name == WOOTHEE_UNKNOWN {
        return "Unknown".to_string();
    }
    if version.is_empty() || version == WOOTHEE_UNKNOWN {
        name.to_string()
    } else {
        format!("{name} {version}")
    }
}
