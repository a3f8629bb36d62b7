use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use glimpse_core::context::{normalize_host, referrer_host};

/// Proxy headers consulted for the client address, most trusted first.
const FORWARDED_IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// The TCP peer address, when the server was started with connect info.
///
/// Never rejects: in-process test routers have no peer and yield `None`.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for PeerAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PeerAddr(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

/// Request facts the identity and context derivations need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Raw client IP. Hashed, never stored or logged as-is.
    pub ip: String,
    pub user_agent: String,
    /// Host the beacon was sent from, for referrer classification. Empty
    /// when nothing identifies it.
    pub site_host: String,
}

impl ClientInfo {
    pub fn from_request(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        page_host: Option<&str>,
    ) -> Self {
        let user_agent = header_str(headers, header::USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string();

        Self {
            ip: client_ip(headers, peer),
            user_agent,
            site_host: site_host(headers, page_host),
        }
    }
}

/// First address in the proxy header chain, else the socket peer, else
/// empty (hashed as "unknown").
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    FORWARDED_IP_HEADERS
        .iter()
        .filter_map(|name| header_str(headers, name))
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

/// The page's own host, then the `Origin` header, then `Host`.
pub fn site_host(headers: &HeaderMap, page_host: Option<&str>) -> String {
    if let Some(host) = page_host.filter(|h| !h.is_empty()) {
        return normalize_host(host);
    }
    if let Some(host) = header_str(headers, header::ORIGIN.as_str()).and_then(referrer_host) {
        return host;
    }
    header_str(headers, header::HOST.as_str())
        .map(normalize_host)
        .unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]);
        assert_eq!(client_ip(&h, None), "203.0.113.9");
    }

    #[test]
    fn falls_through_proxy_headers_to_peer() {
        let h = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&h, None), "198.51.100.4");

        let h = headers(&[("cf-connecting-ip", "2001:db8::1")]);
        assert_eq!(client_ip(&h, None), "2001:db8::1");

        let peer: SocketAddr = "192.0.2.7:51000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.7");
        assert_eq!(client_ip(&HeaderMap::new(), None), "");
    }

    #[test]
    fn site_host_prefers_page_then_origin_then_host() {
        let h = headers(&[
            ("origin", "https://Shop.Example.com"),
            ("host", "api.example.com:3000"),
        ]);
        assert_eq!(site_host(&h, Some("example.com")), "example.com");
        assert_eq!(site_host(&h, None), "shop.example.com");

        let h = headers(&[("host", "Example.com:8080")]);
        assert_eq!(site_host(&h, None), "example.com");
        assert_eq!(site_host(&HeaderMap::new(), None), "");
    }
}
