//! Side-effect-free classification of request context.
//!
//! Nothing here fails outward: unresolvable inputs come back as the explicit
//! `Unknown` / [`ReferrerType::None`] variants.

pub mod geo;
pub mod referrer;
pub mod user_agent;

pub use geo::{Country, GeoLocation, GeoResolver, Region};
pub use referrer::{classify_referrer, normalize_host, referrer_host, ReferrerType};
pub use user_agent::{parse_user_agent, Device, UserAgentInfo};

/// Everything derived from request headers for one beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_agent: UserAgentInfo,
    pub geo: GeoLocation,
    pub referrer_type: ReferrerType,
}

/// Run all three classifiers.
pub fn classify(
    geo: &GeoResolver,
    ip: &str,
    user_agent: &str,
    referrer: &str,
    site_host: &str,
) -> RequestContext {
    RequestContext {
        user_agent: parse_user_agent(user_agent),
        geo: geo.resolve(ip),
        referrer_type: classify_referrer(referrer, site_host),
    }
}
