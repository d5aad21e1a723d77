//! Header manipulation for forwarded traffic.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Set X-Forwarded-Host and X-Forwarded-Proto
//! - Tell the upstream which obfuscated path the client actually requested
//!
//! # Design Decisions
//! - Incoming X-Forwarded-* values are overwritten, not appended to
//! - Headers named in `Connection` are hop-by-hop too

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Header telling the upstream the visible (obfuscated) path.
pub const X_ORIGINAL_PATH: HeaderName = HeaderName::from_static("x-route-cloak-original-path");

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Prepare request headers for the upstream.
pub fn prepare_upstream_headers(headers: &mut HeaderMap, proto: &'static str, original_path: Option<&str>) {
    strip_hop_by_hop(headers);

    if let Some(host) = headers.get(header::HOST).cloned() {
        headers.insert(X_FORWARDED_HOST, host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(proto));

    headers.remove(X_ORIGINAL_PATH);
    if let Some(value) = original_path.and_then(|p| HeaderValue::from_str(p).ok()) {
        headers.insert(X_ORIGINAL_PATH, value);
    }
}
