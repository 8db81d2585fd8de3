//! Header filtering across the proxy boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop and framing headers from requests sent upstream
//! - Strip transport headers from upstream responses relayed to the client
//! - Drop the client's `authorization` header when the server injects its own credential
//! - Leave content negotiation to the upstream client, which only offers
//!   encodings it can decode before `content-encoding` is stripped
//!
//! # Design Decisions
//! - Pure functions over `HeaderMap`, which is an ordered multi-map:
//!   repeated headers keep their order and multiplicity
//! - Matching is case-insensitive; header names are normalised by the HTTP stack

use axum::http::HeaderMap;

/// Headers never forwarded upstream.
pub const REQUEST_EXCLUDED: &[&str] = &[
    "host",
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
];

/// Negotiated by the upstream client itself. A client offer could select an
/// encoding the relay cannot decode.
pub const NEGOTIATED_UPSTREAM: &[&str] = &["accept-encoding"];

/// Headers never relayed back to the client.
pub const RESPONSE_EXCLUDED: &[&str] = &[
    "content-encoding",
    "transfer-encoding",
    "connection",
    "keep-alive",
];

/// Policy for the request direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestHeaderPolicy {
    /// The server injects its own credential, so the client's is dropped.
    pub credential_injected: bool,
}

fn is_listed(name: &str, list: &[&str]) -> bool {
    list.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Whether an inbound header may be forwarded upstream.
pub fn forwards_upstream(name: &str, policy: RequestHeaderPolicy) -> bool {
    if is_listed(name, REQUEST_EXCLUDED) || is_listed(name, NEGOTIATED_UPSTREAM) {
        return false;
    }
    !(policy.credential_injected && name.eq_ignore_ascii_case("authorization"))
}

/// Whether an upstream response header may be relayed to the client.
pub fn relays_downstream(name: &str) -> bool {
    !is_listed(name, RESPONSE_EXCLUDED)
}

/// Filter inbound request headers for the upstream request.
pub fn filter_request_headers(headers: &HeaderMap, policy: RequestHeaderPolicy) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if forwards_upstream(name.as_str(), policy) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Filter upstream response headers for the outbound response.
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if relays_downstream(name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}
