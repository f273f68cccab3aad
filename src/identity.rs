// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client identity resolution.
//!
//! Rate limiting keys on the client IP as seen through whatever proxy
//! chain fronts the service: the leftmost `X-Forwarded-For` address
//! when present and syntactically valid, else `X-Real-IP`, else the
//! direct peer address. When none resolves the caller fails open: an
//! unattributable request is allowed rather than blocking legitimate
//! traffic behind a misconfigured proxy. That decision is the
//! caller's; this module only reports `None`.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Parse a single address candidate. Tolerates surrounding whitespace
/// and appended ports (`1.2.3.4:80`, `[::1]:443`) as written by some
/// proxies.
pub fn normalize_ip(raw: &str) -> Option<IpAddr> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Ok(ip) = candidate.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = candidate.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    None
}

/// Resolve the client IP from forwarding headers and the peer address.
///
/// Only the leftmost `X-Forwarded-For` entry is considered: entries to
/// the right are appended by intermediaries and the leftmost is the
/// original client as reported by the first proxy.
pub fn resolve_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
) -> Option<IpAddr> {
    if let Some(header) = forwarded_for {
        let leftmost = header.split(',').next().unwrap_or("");
        if let Some(ip) = normalize_ip(leftmost) {
            return Some(ip);
        }
        debug!(header = %header, "Unparseable X-Forwarded-For, falling through");
    }

    if let Some(header) = real_ip {
        if let Some(ip) = normalize_ip(header) {
            return Some(ip);
        }
        debug!(header = %header, "Unparseable X-Real-IP, falling through");
    }

    peer
}

/// Resolve the client IP from request headers plus the connection peer.
pub fn client_ip_from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded_for = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());
    let real_ip = headers.get(X_REAL_IP).and_then(|v| v.to_str().ok());
    resolve_client_ip(forwarded_for, real_ip, peer.map(|addr| addr.ip()))
}
