use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

/// Token substituted for a missing IP or user-agent inside the hash input.
///
/// Keeps identifiers deterministic (and non-empty) when a request carries no
/// usable client address or `User-Agent` header.
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Field separator inside the hash input. Prevents `("ab", "c")` and
/// `("a", "bc")` from colliding.
const SEP: u8 = 0x1f;

/// Pseudonymous identifiers derived for one beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub visitor_id: String,
    pub session_id: String,
}

/// Derives one-way visitor and session identifiers from raw request data.
///
/// Both identifiers are `sha256(fields ∥ secret)[0..16]` encoded as 32 hex
/// characters:
///
/// - `visitor_id` hashes `(ip, user_agent, secret)` and is stable across days.
/// - `session_id` additionally hashes the UTC calendar date, so it rotates at
///   midnight UTC and a "session" never outlives one day.
///
/// The hash is always computed from the raw IP; [`anonymize_ip`] output is
/// only for storage and logs.
#[derive(Clone)]
pub struct IdentityHasher {
    secret: String,
}

impl fmt::Debug for IdentityHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityHasher")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl IdentityHasher {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn visitor_id(&self, ip: &str, user_agent: &str) -> String {
        self.digest(&[canonical(ip), canonical(user_agent)])
    }

    pub fn session_id(&self, ip: &str, user_agent: &str, date: NaiveDate) -> String {
        let day = date.format("%Y-%m-%d").to_string();
        self.digest(&[canonical(ip), canonical(user_agent), &day])
    }

    /// Derive both identifiers for a beacon received at `now`.
    pub fn identify(&self, ip: &str, user_agent: &str, now: DateTime<Utc>) -> Identity {
        Identity {
            visitor_id: self.visitor_id(ip, user_agent),
            session_id: self.session_id(ip, user_agent, now.date_naive()),
        }
    }

    fn digest(&self, fields: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update(field.as_bytes());
            hasher.update([SEP]);
        }
        hasher.update(self.secret.as_bytes());
        let hash = hasher.finalize();
        hex::encode(&hash[..16])
    }
}

fn canonical(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN_TOKEN
    } else {
        trimmed
    }
}

/// Truncate an IP address for storage or logging.
///
/// IPv4 keeps the first three octets (`a.b.c.0`); IPv6 keeps the first four
/// groups (`a:b:c:d::`). IPv4-mapped IPv6 addresses are treated as IPv4.
/// Anything unparseable becomes `"unknown"`.
pub fn anonymize_ip(ip: &str) -> String {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            let [a, b, c, _] = v4.octets();
            format!("{a}.{b}.{c}.0")
        }
        Ok(IpAddr::V6(v6)) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                let [a, b, c, _] = v4.octets();
                return format!("{a}.{b}.{c}.0");
            }
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}:{:x}::", s[0], s[1], s[2], s[3])
        }
        Err(_) => UNKNOWN_TOKEN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Chrome/120.0";

    fn hasher() -> IdentityHasher {
        IdentityHasher::new("test-secret")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
    }

    #[test]
    fn identifiers_are_32_hex_chars() {
        let id = hasher().visitor_id("203.0.113.42", UA);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, m, s).unwrap()
    }

    #[test]
    fn visitor_id_is_stable_across_days() {
        let h = hasher();
        let monday = h.identify("203.0.113.42", UA, at(2, 9, 0, 0));
        let tuesday = h.identify("203.0.113.42", UA, at(3, 9, 0, 0));
        assert_eq!(monday.visitor_id, tuesday.visitor_id);
        assert_ne!(monday.session_id, tuesday.session_id);
    }

    #[test]
    fn session_id_is_stable_within_a_day() {
        let h = hasher();
        let morning = h.identify("203.0.113.42", UA, at(2, 0, 0, 1));
        let night = h.identify("203.0.113.42", UA, at(2, 23, 59, 59));
        assert_eq!(morning, night);
    }

    #[test]
    fn changing_ip_or_ua_changes_ids() {
        let h = hasher();
        let base = h.session_id("203.0.113.42", UA, day(2));
        assert_ne!(base, h.session_id("203.0.113.43", UA, day(2)));
        assert_ne!(base, h.session_id("203.0.113.42", "curl/8.0", day(2)));
        assert_ne!(
            h.visitor_id("203.0.113.42", UA),
            h.visitor_id("203.0.113.42", "curl/8.0")
        );
    }

    #[test]
    fn secret_changes_ids() {
        let a = IdentityHasher::new("one").visitor_id("203.0.113.42", UA);
        let b = IdentityHasher::new("two").visitor_id("203.0.113.42", UA);
        assert_ne!(a, b);
    }

    #[test]
    fn missing_inputs_are_deterministic_and_non_empty() {
        let h = hasher();
        let a = h.visitor_id("", "");
        assert!(!a.is_empty());
        assert_eq!(a, h.visitor_id("  ", ""));
        assert_eq!(a, h.visitor_id(UNKNOWN_TOKEN, UNKNOWN_TOKEN));
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        let h = hasher();
        assert_ne!(h.visitor_id("1.2.3.4", "5abc"), h.visitor_id("1.2.3.45", "abc"));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let printed = format!("{:?}", hasher());
        assert!(!printed.contains("test-secret"));
    }

    #[test]
    fn anonymize_ipv4_zeroes_last_octet() {
        assert_eq!(anonymize_ip("203.0.113.42"), "203.0.113.0");
    }

    #[test]
    fn anonymize_ipv6_keeps_four_groups() {
        assert_eq!(
            anonymize_ip("2001:db8:85a3:8d3:1319:8a2e:370:7348"),
            "2001:db8:85a3:8d3::"
        );
        assert_eq!(anonymize_ip("2001:db8::1"), "2001:db8:0:0::");
    }

    #[test]
    fn anonymize_mapped_ipv6_as_ipv4() {
        assert_eq!(anonymize_ip("::ffff:198.51.100.7"), "198.51.100.0");
    }

    #[test]
    fn anonymize_garbage_is_unknown() {
        assert_eq!(anonymize_ip(""), "unknown");
        assert_eq!(anonymize_ip("not-an-ip"), "unknown");
    }
}
