//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dashboard
//! proxy. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default upstream domain used when `DOMINO_DOMAIN` is unset.
pub const DEFAULT_DOMINO_DOMAIN: &str = "https://se-demo.domino.tech";

/// Root configuration for the dashboard proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Domino deployment settings exposed to page templates.
    pub domino: DominoConfig,

    /// Reverse proxy behaviour.
    pub proxy: ProxyConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Page templates and static assets.
    pub pages: PagesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
        }
    }
}

/// Domino deployment settings.
///
/// Sourced from the process environment at startup. The API key is never
/// returned through the proxy's own responses.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DominoConfig {
    /// Project identifier (`DOMINO_PROJECT_ID`).
    pub project_id: String,

    /// Run-host path prefix (`DOMINO_RUN_HOST_PATH`).
    pub run_host_path: String,

    /// Upstream base URL (`DOMINO_DOMAIN`).
    pub domain: String,

    /// Server-side credential (`DOMINO_API_KEY`).
    pub api_key: Option<String>,
}

impl DominoConfig {
    /// Configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl Default for DominoConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            run_host_path: String::new(),
            domain: DEFAULT_DOMINO_DOMAIN.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for DominoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DominoConfig")
            .field("project_id", &self.project_id)
            .field("run_host_path", &self.run_host_path)
            .field("domain", &self.domain)
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .finish()
    }
}

/// Reverse proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Query parameter carrying the upstream base URL.
    pub target_param: String,

    /// Header carrying the upstream base URL.
    pub target_header: String,

    /// Time allowed for the upstream to return response headers, in seconds.
    pub upstream_timeout_secs: u64,

    /// Upstream TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum inbound request body in bytes.
    pub max_body_bytes: usize,

    /// API prefix appended to the domain for the governance route.
    pub governance_prefix: String,

    /// Header used to inject the server-side credential upstream.
    pub credential_header: String,
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            target_param: "target".to_string(),
            target_header: "X-Target-Url".to_string(),
            upstream_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            governance_prefix: "/api/governance/v1".to_string(),
            credential_header: "X-Domino-Api-Key".to_string(),
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Apply the CORS layer.
    pub enabled: bool,

    /// Origins allowed in addition to the configured domain and the local defaults.
    pub extra_origins: Vec<String>,
}

/// Page template and static asset locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Directory holding `index.html` and `original_index.html`.
    pub template_dir: String,

    /// Directory served under `/static`.
    pub static_dir: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            template_dir: "templates".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
