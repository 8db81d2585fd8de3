//! Request forwarding.
//!
//! # States
//! ```text
//! Preflight ──OPTIONS──────────────────────────────▶ 204, no upstream call
//!     │
//!     ▼
//! resolve target ──none / invalid─────────────────▶ 400 {"error": ...}
//!     │
//!     ▼
//! Forwarding ──transport failure / timeout────────▶ 502 {"error": ...}
//!     │      ──local fault────────────────────────▶ 500 {"error": ...}
//!     ▼
//! upstream status + filtered headers + streamed body
//! ```
//!
//! A `Forwarder` holds only read-only state (client pool, addressing mode,
//! credential, timeout) and is cloned into every request.

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::time::{Duration, Instant};
use url::Url;

use crate::http::response::ProxyError;
use crate::proxy::params::QueryParams;
use crate::proxy::stream::UpstreamBody;
use crate::proxy::target::{build_upstream_url, ensure_within, AddressingMode};
use crate::resilience::timeouts::with_timeout;
use crate::security::headers::{filter_request_headers, filter_response_headers, RequestHeaderPolicy};

/// A request as received, after the proxy prefix is removed.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path after the proxy prefix, percent-encoding intact.
    pub path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
    /// `None` for GET, HEAD and OPTIONS.
    pub body: Option<Bytes>,
}

impl InboundRequest {
    pub fn new(method: Method, path: impl Into<String>, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        let body = if carries_body(&method) { Some(body) } else { None };
        Self {
            method,
            path: path.into(),
            query: QueryParams::parse(uri.query()),
            headers,
            body,
        }
    }
}

fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// The request sent upstream. Built once per inbound request.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl UpstreamRequest {
    /// Origin and path only; queries may carry secrets and stay out of logs.
    pub fn log_target(&self) -> String {
        format!("{}{}", self.url.origin().ascii_serialization(), self.url.path())
    }
}

/// Server-side credential injected into upstream requests.
#[derive(Clone)]
pub struct Credential {
    header: HeaderName,
    value: HeaderValue,
}

impl Credential {
    pub fn new(header: &str, secret: &str) -> Result<Self, ProxyError> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| ProxyError::Internal(format!("invalid credential header: {e}")))?;
        let mut value = HeaderValue::from_str(secret)
            .map_err(|_| ProxyError::Internal("credential is not a valid header value".into()))?;
        value.set_sensitive(true);
        Ok(Self { header, value })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Forwards inbound requests to one upstream addressing mode.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    mode: AddressingMode,
    credential: Option<Credential>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, mode: AddressingMode, timeout: Duration) -> Self {
        Self {
            client,
            mode,
            credential: None,
            timeout,
        }
    }

    /// Inject `credential` into every upstream request.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn mode(&self) -> &AddressingMode {
        &self.mode
    }

    /// Handle one inbound request. Every failure becomes a JSON error response.
    pub async fn forward(&self, inbound: InboundRequest) -> Response {
        if inbound.method == Method::OPTIONS {
            return StatusCode::NO_CONTENT.into_response();
        }

        let upstream = match self.prepare(&inbound) {
            Ok(upstream) => upstream,
            Err(e) => return e.into_response(),
        };

        match self.dispatch(upstream).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }

    /// Derive the upstream request. Performs no I/O.
    pub fn prepare(&self, inbound: &InboundRequest) -> Result<UpstreamRequest, ProxyError> {
        let target = self.mode.resolve(&inbound.query, &inbound.headers)?;
        let params = self.mode.forwarded_params(&inbound.query);
        let url = build_upstream_url(&target.base, &inbound.path, &params)?;
        if let AddressingMode::Static { base } = &self.mode {
            ensure_within(base, &url)?;
        }

        let policy = RequestHeaderPolicy {
            credential_injected: self.credential.is_some(),
        };
        let mut headers = filter_request_headers(&inbound.headers, policy);
        if let Some(credential) = &self.credential {
            headers.insert(credential.header.clone(), credential.value.clone());
        }

        Ok(UpstreamRequest {
            method: inbound.method.clone(),
            url,
            headers,
            body: inbound.body.clone(),
        })
    }

    async fn dispatch(&self, upstream: UpstreamRequest) -> Result<Response, ProxyError> {
        let start = Instant::now();
        let log_target = upstream.log_target();
        let method = upstream.method.clone();

        let mut builder = self
            .client
            .request(upstream.method, upstream.url)
            .headers(upstream.headers);
        if let Some(body) = upstream.body {
            builder = builder.body(body);
        }
        let request = builder
            .build()
            .map_err(|e| ProxyError::Internal(error_chain(&e)))?;

        let response = with_timeout(self.timeout, self.client.execute(request))
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(self.timeout))?
            .map_err(classify)?;

        let status = response.status();
        tracing::info!(
            method = %method,
            upstream = %log_target,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Forwarded request"
        );

        let headers = filter_response_headers(response.headers());
        let mut outbound = Response::new(Body::from_stream(UpstreamBody::new(response, log_target)));
        *outbound.status_mut() = status;
        *outbound.headers_mut() = headers;
        Ok(outbound)
    }
}

/// Map a client error: building faults are ours, everything else is transport.
fn classify(e: reqwest::Error) -> ProxyError {
    if e.is_builder() {
        ProxyError::Internal(error_chain(&e))
    } else {
        ProxyError::UpstreamUnreachable(error_chain(&e))
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic_forwarder() -> Forwarder {
        Forwarder::new(
            reqwest::Client::new(),
            AddressingMode::Dynamic {
                param: "target".into(),
                header: HeaderName::from_static("x-target-url"),
            },
            Duration::from_secs(5),
        )
    }

    fn governance_forwarder() -> Forwarder {
        Forwarder::new(
            reqwest::Client::new(),
            AddressingMode::Static {
                base: Url::parse("https://domino.example.com/api/governance/v1").unwrap(),
            },
            Duration::from_secs(5),
        )
        .with_credential(Credential::new("X-Domino-Api-Key", "server-key").unwrap())
    }

    fn inbound(method: Method, path: &str, uri: &str, headers: &[(&'static str, &'static str)]) -> InboundRequest {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.append(*k, HeaderValue::from_static(v));
        }
        let uri: Uri = uri.parse().unwrap();
        InboundRequest::new(method, path, &uri, map, Bytes::from_static(b"{\"a\":1}"))
    }

    #[test]
    fn prepare_dynamic_request() {
        let req = inbound(
            Method::GET,
            "foo/bar",
            "/proxy/foo/bar?x=1&target=https://api.example.com",
            &[("host", "localhost:8888"), ("accept", "application/json"), ("authorization", "Bearer u")],
        );
        let upstream = dynamic_forwarder().prepare(&req).unwrap();

        assert_eq!(upstream.url.as_str(), "https://api.example.com/foo/bar?x=1");
        assert_eq!(upstream.method, Method::GET);
        assert!(upstream.headers.get("host").is_none());
        assert_eq!(upstream.headers["authorization"], "Bearer u");
        assert!(upstream.body.is_none());
        assert_eq!(upstream.log_target(), "https://api.example.com/foo/bar");
    }

    #[test]
    fn prepare_is_repeatable() {
        let req = inbound(
            Method::PUT,
            "items/3",
            "/proxy/items/3?target=https://api.example.com&a=1&a=2",
            &[("content-type", "application/json"), ("x-tag", "t")],
        );
        let forwarder = dynamic_forwarder();
        let first = forwarder.prepare(&req).unwrap();
        let second = forwarder.prepare(&req).unwrap();

        assert_eq!(first.url, second.url);
        assert_eq!(first.headers, second.headers);
        assert_eq!(first.url.query(), Some("a=1&a=2"));
        assert_eq!(first.body.as_deref(), Some(&b"{\"a\":1}"[..]));
    }

    #[test]
    fn governance_injects_credential_and_drops_client_auth() {
        let req = inbound(
            Method::POST,
            "bundles",
            "/proxy/governance/bundles?target=https://evil.example.com",
            &[("authorization", "Bearer client"), ("x-domino-api-key", "client-key")],
        );
        let upstream = governance_forwarder().prepare(&req).unwrap();

        assert_eq!(
            upstream.url.as_str(),
            "https://domino.example.com/api/governance/v1/bundles?target=https%3A%2F%2Fevil.example.com"
        );
        assert!(upstream.headers.get("authorization").is_none());
        let keys: Vec<_> = upstream.headers.get_all("x-domino-api-key").iter().collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].to_str().unwrap(), "server-key");
        assert!(keys[0].is_sensitive());
    }

    #[tokio::test]
    async fn governance_path_cannot_climb_out_of_prefix() {
        let req = inbound(
            Method::GET,
            "%2e%2e/%2e%2e/%2e%2e/admin/secrets",
            "/proxy/governance/%2e%2e/%2e%2e/%2e%2e/admin/secrets",
            &[],
        );
        let forwarder = governance_forwarder();
        assert!(matches!(forwarder.prepare(&req), Err(ProxyError::InvalidTarget(_))));

        let response = forwarder.forward(req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn prepare_without_target_fails() {
        let req = inbound(Method::GET, "foo", "/proxy/foo", &[]);
        let err = dynamic_forwarder().prepare(&req).unwrap_err();
        assert!(matches!(err, ProxyError::MissingTarget(_)));
    }

    #[tokio::test]
    async fn options_short_circuits() {
        let req = inbound(Method::OPTIONS, "foo", "/proxy/foo", &[]);
        let response = dynamic_forwarder().forward(req).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), 16).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn missing_target_is_400_json() {
        let req = inbound(Method::GET, "foo", "/proxy/foo?x=1", &[]);
        let response = dynamic_forwarder().forward(req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("target"));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("X-Domino-Api-Key", "server-key").unwrap();
        assert!(!format!("{:?}", credential).contains("server-key"));
    }
}
