use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

const UNKNOWN: &str = "Unknown";

/// ISO 3166-1 alpha-2 country code, or the explicit "could not resolve" case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Country {
    Code(String),
    Unknown,
}

/// Subdivision (state/province) ISO code, or the explicit "could not resolve"
/// case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Region {
    Code(String),
    Unknown,
}

macro_rules! geo_code_impls {
    ($ty:ident) => {
        impl $ty {
            pub fn as_str(&self) -> &str {
                match self {
                    $ty::Code(code) => code,
                    $ty::Unknown => UNKNOWN,
                }
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, $ty::Unknown)
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                if value.is_empty() || value == UNKNOWN {
                    $ty::Unknown
                } else {
                    $ty::Code(value)
                }
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

geo_code_impls!(Country);
geo_code_impls!(Region);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: Country,
    pub region: Region,
}

impl GeoLocation {
    pub fn unknown() -> Self {
        Self {
            country: Country::Unknown,
            region: Region::Unknown,
        }
    }
}

/// IP → country/region lookups against an offline MaxMind/DB-IP City
/// database.
///
/// The database is read into memory once. A resolver without a database
/// (file missing, unreadable) answers every lookup with
/// [`GeoLocation::unknown`].
pub struct GeoResolver {
    reader: Option<maxminddb::Reader<Vec<u8>>>,
}

impl GeoResolver {
    /// Open the `.mmdb` file at `path`.
    ///
    /// Returns the underlying error so the caller can log it; use
    /// [`GeoResolver::disabled`] as the fallback.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, maxminddb::MaxMindDBError> {
        let reader = maxminddb::Reader::open_readfile(path)?;
        Ok(Self {
            reader: Some(reader),
        })
    }

    pub fn disabled() -> Self {
        Self { reader: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.reader.is_some()
    }

    pub fn resolve(&self, ip: &str) -> GeoLocation {
        let Some(reader) = self.reader.as_ref() else {
            return GeoLocation::unknown();
        };
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            return GeoLocation::unknown();
        };
        let Ok(record) = reader.lookup::<maxminddb::geoip2::City>(addr) else {
            return GeoLocation::unknown();
        };

        let country = record
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .map(|code| Country::Code(code.to_string()))
            .unwrap_or(Country::Unknown);

        let region = record
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| sub.iso_code)
            .map(|code| Region::Code(code.to_string()))
            .unwrap_or(Region::Unknown);

        GeoLocation { country, region }
    }
}

impl fmt::Debug for GeoResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoResolver")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_resolver_is_unknown() {
        let geo = GeoResolver::disabled();
        assert_eq!(geo.resolve("203.0.113.42"), GeoLocation::unknown());
    }

    #[test]
    fn missing_database_is_an_error() {
        assert!(GeoResolver::open("/nonexistent/GeoLite2-City.mmdb").is_err());
    }

    #[test]
    fn unknown_serializes_as_sentinel_string() {
        assert_eq!(Country::Unknown.as_str(), "Unknown");
        assert_eq!(Country::from("Unknown".to_string()), Country::Unknown);
        assert_eq!(Country::from(String::new()), Country::Unknown);
        assert_eq!(Region::from("CA".to_string()), Region::Code("CA".to_string()));
        let json = serde_json::to_string(&Country::Code("PL".to_string())).expect("serialize");
        assert_eq!(json, "\"PL\"");
    }
}
