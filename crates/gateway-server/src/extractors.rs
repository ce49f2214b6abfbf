//! Custom Axum extractors for the gateway.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::convert::Infallible;

/// Sentinel key for callers that cannot be identified
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Correlation id set by the request-id middleware
#[derive(Debug, Clone)]
pub struct RequestId(pub gateway_core::RequestId);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Handlers mounted without the middleware still get an id.
        let id = parts
            .extensions
            .get::<gateway_core::RequestId>()
            .cloned()
            .unwrap_or_else(gateway_core::RequestId::generate);

        Ok(Self(id))
    }
}

/// Opaque caller identity used as the rate-limit key.
///
/// Bearer token, else the first `x-forwarded-for` address, else `x-real-ip`,
/// else [`UNKNOWN_CLIENT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_key(&parts.headers)))
    }
}

/// Derive the rate-limit key from request headers
#[must_use]
pub fn client_key(headers: &HeaderMap) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(token) = header_str(header::AUTHORIZATION.as_str())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        return token.to_string();
    }

    if let Some(ip) = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    header_str("x-real-ip").map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
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
    fn test_bearer_token_wins() {
        let map = headers(&[
            ("authorization", "Bearer sk-abc"),
            ("x-forwarded-for", "10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_key(&map), "sk-abc");
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_key(&map), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_then_unknown() {
        assert_eq!(client_key(&headers(&[("x-real-ip", "10.0.0.2")])), "10.0.0.2");
        assert_eq!(client_key(&HeaderMap::new()), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz"), ("x-real-ip", "10.0.0.9")]);
        assert_eq!(client_key(&map), "10.0.0.9");
    }
}
