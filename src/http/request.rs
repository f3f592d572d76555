//! Request metadata: request ids and caller addresses.
//!
//! # Responsibilities
//! - Name the request-id header and build the per-request span
//! - Resolve the caller address used as the rate-limit key
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-For` is ignored unless explicitly trusted

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{connect_info::MockConnectInfo, ConnectInfo},
    http::{HeaderMap, HeaderName, Request},
};
use tracing::Span;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Caller address as seen by the pipeline. `None` when the transport gave none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub Option<IpAddr>);

impl ClientAddr {
    /// Key for per-address state. Unknown callers share one bucket.
    pub fn key(&self) -> String {
        match self.0 {
            Some(ip) => ip.to_string(),
            None => "unknown".to_string(),
        }
    }
}

impl std::fmt::Display for ClientAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Resolve the caller address for `request`.
///
/// Uses the peer address recorded by `into_make_service_with_connect_info`
/// (or `MockConnectInfo` in tests), or the first `X-Forwarded-For` hop when
/// `trust_forwarded_for` is set and the header parses.
pub fn resolve_client_addr(request: &Request<Body>, trust_forwarded_for: bool) -> ClientAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request.headers()) {
            return ClientAddr(Some(normalize(ip)));
        }
    }

    let extensions = request.extensions();
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| extensions.get::<MockConnectInfo<SocketAddr>>().map(|m| m.0));

    ClientAddr(peer.map(|addr| normalize(addr.ip())))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Collapse IPv4-mapped IPv6 addresses so one caller maps to one key.
fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

/// Span factory for `TraceLayer`; carries the request id into every event.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}
