//! Cross-origin policy for browser access to the proxy.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::DashboardConfig;

/// Local origins always allowed alongside the configured domain.
pub const DEFAULT_ORIGINS: &[&str] = &["http://localhost:8888", "http://127.0.0.1:8888"];

/// Build the explicit origin allow-list.
pub fn allowed_origins(config: &DashboardConfig) -> Vec<HeaderValue> {
    let domain = config.domino.domain.trim_end_matches('/');

    std::iter::once(domain)
        .chain(DEFAULT_ORIGINS.iter().copied())
        .chain(config.cors.extra_origins.iter().map(String::as_str))
        .filter_map(|o| o.parse().ok())
        .collect()
}

/// Create the CORS layer.
pub fn cors_layer(config: &DashboardConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(config)))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-domino-api-key"),
            header::ACCEPT,
        ])
}
