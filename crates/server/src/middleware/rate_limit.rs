//! Per-IP rate limiting for the public tracking lookups.
//!
//! Tracking numbers are the only credential on the public endpoints, so the
//! lookup is throttled per client IP to make enumeration impractical.
//!
//! Proxy headers are client-controlled unless a trusted proxy overwrites
//! them, so they are only read when `TRACKER_TRUST_PROXY_HEADERS` is set.
//! Otherwise the socket peer address is the key.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor for the client IP.
///
/// With `trust_proxy_headers` the order is `CF-Connecting-IP`, first
/// `X-Forwarded-For` entry, `X-Real-IP`, `Fly-Client-IP`, then the socket
/// peer from `ConnectInfo`. Without it only the socket peer is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIpKeyExtractor {
    pub trust_proxy_headers: bool,
}

const PROXY_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let forwarded = if self.trust_proxy_headers {
            PROXY_HEADERS.into_iter().find_map(|name| header_ip(req, name))
        } else {
            None
        };

        forwarded
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
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the rate limiter for public tracking lookups: ~30 requests per minute per IP.
///
/// `trust_proxy_headers` must only be set behind a proxy that overwrites the
/// forwarding headers.
///
/// Configuration: 1 request every 2 seconds (replenish), burst of 10.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(2)` and `burst_size(10)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn public_lookup_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor {
            trust_proxy_headers,
        })
        .per_second(2)
        .burst_size(10)
        .finish()
        .expect("rate limiter config with per_second(2) and burst_size(10) is valid");
    GovernorLayer::new(Arc::new(config))
}
