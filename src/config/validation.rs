//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that URLs and header names are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DashboardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::DashboardConfig;

/// Longest upstream timeout accepted, in seconds.
pub const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 600;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &DashboardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::new("listener.port", "must be non-zero"));
    }

    match Url::parse(&config.domino.domain) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(url) => errors.push(ValidationError::new(
            "domino.domain",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("domino.domain", format!("invalid URL: {e}"))),
    }

    let proxy = &config.proxy;
    if proxy.upstream_timeout_secs == 0 || proxy.upstream_timeout_secs > MAX_UPSTREAM_TIMEOUT_SECS {
        errors.push(ValidationError::new(
            "proxy.upstream_timeout_secs",
            format!("must be between 1 and {MAX_UPSTREAM_TIMEOUT_SECS}"),
        ));
    }
    if proxy.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("proxy.connect_timeout_secs", "must be non-zero"));
    }
    if proxy.max_body_bytes == 0 {
        errors.push(ValidationError::new("proxy.max_body_bytes", "must be non-zero"));
    }
    if proxy.target_param.is_empty() {
        errors.push(ValidationError::new("proxy.target_param", "must not be empty"));
    }
    if HeaderName::from_bytes(proxy.target_header.as_bytes()).is_err() {
        errors.push(ValidationError::new("proxy.target_header", "not a valid header name"));
    }
    if HeaderName::from_bytes(proxy.credential_header.as_bytes()).is_err() {
        errors.push(ValidationError::new("proxy.credential_header", "not a valid header name"));
    }
    if !proxy.governance_prefix.starts_with('/') {
        errors.push(ValidationError::new("proxy.governance_prefix", "must start with '/'"));
    }

    if let Some(key) = config.domino.api_key() {
        if HeaderValue::from_str(key).is_err() {
            errors.push(ValidationError::new("domino.api_key", "not a valid header value"));
        }
    }

    for origin in &config.cors.extra_origins {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.extra_origins",
                format!("'{origin}' is not a valid header value"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
