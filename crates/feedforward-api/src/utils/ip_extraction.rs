//! Client IP resolution for per-IP admission limits.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::AppState;

pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Resolved client IP of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            socket_addr.as_ref(),
            state.config.trusted_proxy_count(),
        )))
    }
}

/// Resolve the client IP from proxy headers, then the socket.
///
/// `X-Forwarded-For` is read right to left: the last `trusted_proxy_count`
/// hops are our own proxies and the entry before them is the client. With no
/// trusted proxies only the hop closest to us is believed. `X-Real-IP` is
/// consulted next, then the socket address. Anything unparsable yields
/// `"unknown"`, which all such clients then share as one identity.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    header_str(headers, "x-forwarded-for")
        .and_then(|chain| client_from_forwarded_for(chain, trusted_proxy_count))
        .or_else(|| header_str(headers, "x-real-ip").and_then(parse_ip))
        .or_else(|| socket_addr.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

fn client_from_forwarded_for(chain: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = chain
        .split(',')
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();
    let last = hops.len().checked_sub(1)?;

    // A chain shorter than the proxy count means the header was not set by our proxies
    let position = if trusted_proxy_count == 0 || hops.len() <= trusted_proxy_count {
        last
    } else {
        last - trusted_proxy_count
    };
    parse_ip(hops[position])
}
