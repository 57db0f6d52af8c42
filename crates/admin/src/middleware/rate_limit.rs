//! Rate limiting for the login form using governor and `tower_governor`.
//!
//! Firebase throttles password attempts on its side too; this keeps a
//! single client from burning through that budget for everyone.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Keys requests by the Fly.io client header, then the first
/// `X-Forwarded-For` hop, then the socket peer.
#[derive(Clone, Copy)]
pub struct PeerIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for PeerIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let header_ip = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        header_ip("fly-client-ip")
            .or_else(|| header_ip("x-forwarded-for"))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for login attempts: ~5 requests per minute per IP.
///
/// # Panics
///
/// Never panics: `per_second(12)` and `burst_size(5)` are valid settings.
#[must_use]
pub fn login_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(PeerIpKeyExtractor)
        .per_second(12) // Replenish 1 token every 12 seconds
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(12) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    #[test]
    fn test_fly_header_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", "198.51.100.1")
            .header("fly-client-ip", "203.0.113.7")
            .body(())
            .unwrap();
        assert_eq!(PeerIpKeyExtractor.extract(&req).unwrap().to_string(), "203.0.113.7");
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut req = Request::builder().body(()).unwrap();
        assert!(PeerIpKeyExtractor.extract(&req).is_err());

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 4000))));
        assert_eq!(PeerIpKeyExtractor.extract(&req).unwrap().to_string(), "192.0.2.9");
    }
}
