//! Upstream addressing: where a proxied request goes.
//!
//! # Addressing Modes
//! - Dynamic: the caller names the upstream base with a query parameter
//!   (checked first) or a header. The parameter is stripped before forwarding.
//! - Static: the base comes from server configuration; nothing on the
//!   request can redirect it.

use axum::http::{HeaderMap, HeaderName};
use url::Url;

use crate::http::response::ProxyError;
use crate::proxy::params::QueryParams;

/// How the upstream base is chosen for a request.
#[derive(Debug, Clone)]
pub enum AddressingMode {
    Dynamic { param: String, header: HeaderName },
    Static { base: Url },
}

/// Where a resolved target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    QueryParam,
    Header,
    Static,
}

/// A resolved upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub base: Url,
    pub source: TargetSource,
}

impl AddressingMode {
    /// Resolve the target for a request. Performs no I/O.
    pub fn resolve(&self, query: &QueryParams, headers: &HeaderMap) -> Result<Target, ProxyError> {
        match self {
            AddressingMode::Static { base } => Ok(Target {
                base: base.clone(),
                source: TargetSource::Static,
            }),
            AddressingMode::Dynamic { param, header } => {
                if let Some(raw) = query.get(param).filter(|v| !v.trim().is_empty()) {
                    return Ok(Target {
                        base: parse_base(raw)?,
                        source: TargetSource::QueryParam,
                    });
                }

                let from_header = headers
                    .get(header)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.trim().is_empty());

                match from_header {
                    Some(raw) => Ok(Target {
                        base: parse_base(raw)?,
                        source: TargetSource::Header,
                    }),
                    None => Err(ProxyError::MissingTarget(format!(
                        "missing upstream target: set the '{}' query parameter or the '{}' header",
                        param, header
                    ))),
                }
            }
        }
    }

    /// Query parameters to forward upstream.
    pub fn forwarded_params(&self, query: &QueryParams) -> QueryParams {
        match self {
            AddressingMode::Dynamic { param, .. } => query.without(param),
            AddressingMode::Static { .. } => query.clone(),
        }
    }
}

/// Parse an upstream base, accepting only absolute http(s) URLs.
pub fn parse_base(raw: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ProxyError::InvalidTarget(format!("invalid target URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(ProxyError::InvalidTarget(format!(
            "target URL must be absolute http(s): '{}'",
            raw
        )));
    }
    Ok(url)
}

/// Join the base, the forwarded path suffix, and the forwarded parameters.
///
/// Any query already on the base is kept ahead of the forwarded parameters.
/// No `?` is emitted when there are no parameters.
pub fn build_upstream_url(base: &Url, suffix: &str, params: &QueryParams) -> Result<Url, ProxyError> {
    let mut root = base.clone();
    root.set_fragment(None);
    let base_query: QueryParams = root.query_pairs().into_owned().collect();
    root.set_query(None);

    let joined = format!(
        "{}/{}",
        root.as_str().trim_end_matches('/'),
        suffix.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined)
        .map_err(|e| ProxyError::InvalidTarget(format!("cannot build upstream URL: {}", e)))?;

    if !base_query.is_empty() || !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(base_query.iter().chain(params.iter()));
    }
    Ok(url)
}

/// Reject an upstream URL that left `base` once dot segments (plain or
/// percent-encoded) were resolved.
pub fn ensure_within(base: &Url, url: &Url) -> Result<(), ProxyError> {
    let root = base.path().trim_end_matches('/');
    let path = url.path();
    let inside = path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'));

    if url.origin() != base.origin() || !inside {
        return Err(ProxyError::InvalidTarget(format!(
            "path escapes the upstream base '{}'",
            base.path()
        )));
    }
    Ok(())
}
