//! Client metadata recorded alongside audit entries and sessions.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Longest user agent kept; the rest is cut off.
const USER_AGENT_MAX: usize = 512;

/// Client IP, user agent and request id of the current request.
///
/// Never rejects; missing headers become `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: client_ip(headers),
            user_agent: header_str(headers, "user-agent")
                .map(|ua| ua.chars().take(USER_AGENT_MAX).collect()),
            request_id: header_str(headers, "x-request-id").map(str::to_string),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// First hop of `x-forwarded-for`, else `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let h = headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.2"),
            ("x-real-ip", "10.0.0.3"),
        ]);
        assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let h = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&h).as_deref(), Some("198.51.100.4"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn meta_reads_all_headers() {
        let h = headers(&[
            ("user-agent", "test-agent/1.0"),
            ("x-request-id", "abc-123"),
            ("x-real-ip", "192.0.2.1"),
        ]);
        let meta = RequestMeta::from_headers(&h);
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(meta.request_id.as_deref(), Some("abc-123"));
        assert_eq!(meta.ip_address.as_deref(), Some("192.0.2.1"));
    }
}
