use crate::rate_limit::sliding_window::RateLimitDecision;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::HeaderName, request::Parts, HeaderMap, HeaderValue},
};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

/// Who a request is counted against: the forwarded client address when a
/// proxy supplied one, otherwise the peer address of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(extract_identity(&parts.headers, peer))
    }
}

/// Extract identifier from request headers, falling back to the peer address
fn extract_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientIdentity {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            let first = value.split(',').next().unwrap_or_default().trim();
            if !first.is_empty() {
                return ClientIdentity::new(first);
            }
        }
    }

    match peer {
        Some(addr) => ClientIdentity::new(addr.ip().to_string()),
        None => ClientIdentity::new("unknown"),
    }
}

/// Add rate limit headers to a response
pub fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitDecision) {
    // X-RateLimit-Limit: Maximum number of requests allowed in the window
    if let Ok(value) = HeaderValue::from_str(&result.limit.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-limit"), value);
    }

    // X-RateLimit-Remaining: Number of requests remaining
    if let Ok(value) = HeaderValue::from_str(&result.remaining.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), value);
    }

    // X-RateLimit-Reset: Unix timestamp when the oldest request leaves the window
    if let Some(reset_at) = result.reset_at {
        if let Ok(value) = HeaderValue::from_str(&reset_at.timestamp().to_string()) {
            headers.insert(HeaderName::from_static("x-ratelimit-reset"), value);
        }
    }
}
