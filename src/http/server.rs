//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID, CORS)
//! - Build the shared upstream client and forwarders once at startup
//! - Dispatch `/proxy/...` to the dynamic or governance forwarder
//! - Serve until an OS signal or an explicit shutdown trigger

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderName, Method, Request, Uri},
    response::Response,
    routing::{get, on, MethodFilter},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use url::Url;

use crate::config::DashboardConfig;
use crate::http::pages::{self, Pages};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::lifecycle::{signals, ShutdownSignal};
use crate::proxy::{AddressingMode, Credential, Forwarder, InboundRequest};
use crate::security::cors::cors_layer;

/// Route prefix of the proxy.
pub const PROXY_PREFIX: &str = "/proxy";

/// First path segment selecting the governance forwarder.
pub const GOVERNANCE_SEGMENT: &str = "governance";

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid proxy configuration: {0}")]
    Config(String),
}

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub pages: Arc<Pages>,
    pub dynamic: Forwarder,
    /// Present only when a server-side API key is configured.
    pub governance: Option<Forwarder>,
}

impl AppState {
    pub fn from_config(config: Arc<DashboardConfig>) -> Result<Self, ServerError> {
        let proxy = &config.proxy;
        let client = reqwest::Client::builder()
            .connect_timeout(proxy.connect_timeout())
            .build()?;

        let header = HeaderName::from_bytes(proxy.target_header.as_bytes())
            .map_err(|e| ServerError::Config(format!("target header: {e}")))?;
        let dynamic = Forwarder::new(
            client.clone(),
            AddressingMode::Dynamic {
                param: proxy.target_param.clone(),
                header,
            },
            proxy.upstream_timeout(),
        );

        let governance = match config.domino.api_key() {
            Some(key) => {
                let base = governance_base(&config)?;
                let credential = Credential::new(&proxy.credential_header, key)
                    .map_err(|e| ServerError::Config(e.to_string()))?;
                tracing::info!(upstream = %base, "Governance proxy enabled");
                Some(
                    Forwarder::new(client, AddressingMode::Static { base }, proxy.upstream_timeout())
                        .with_credential(credential),
                )
            }
            None => {
                tracing::info!("No DOMINO_API_KEY configured, governance proxy disabled");
                None
            }
        };

        Ok(Self {
            pages: Arc::new(Pages::load(&config.pages, &config.domino)),
            config,
            dynamic,
            governance,
        })
    }
}

/// Static upstream base of the governance route: domain plus API prefix.
pub fn governance_base(config: &DashboardConfig) -> Result<Url, ServerError> {
    let raw = format!(
        "{}{}",
        config.domino.domain.trim_end_matches('/'),
        config.proxy.governance_prefix
    );
    Url::parse(&raw).map_err(|e| ServerError::Config(format!("governance base '{raw}': {e}")))
}

/// HTTP server for the dashboard.
pub struct HttpServer {
    router: Router,
    config: Arc<DashboardConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: DashboardConfig) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let state = AppState::from_config(config.clone())?;
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &DashboardConfig, state: AppState) -> Router {
        let proxy_methods = MethodFilter::GET
            .or(MethodFilter::POST)
            .or(MethodFilter::PUT)
            .or(MethodFilter::DELETE)
            .or(MethodFilter::PATCH)
            .or(MethodFilter::OPTIONS);

        let router = Router::new()
            .route("/_stcore/health", get(pages::health))
            .route("/_stcore/host-config", get(pages::host_config))
            .route("/", get(pages::index))
            .route("/original", get(pages::original))
            .route(PROXY_PREFIX, on(proxy_methods, proxy_handler))
            .route("/proxy/", on(proxy_methods, proxy_handler))
            .route("/proxy/{*path}", on(proxy_methods, proxy_handler))
            .nest_service("/static", ServeDir::new(&config.pages.static_dir))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.proxy.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = request.request_id().unwrap_or("-"),
                        )
                    }))
                    .layer(propagate_request_id_layer()),
            );

        if config.cors.enabled {
            router.layer(cors_layer(config))
        } else {
            router
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            governance = self.config.domino.api_key().is_some(),
            cors = self.config.cors.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signals::terminate() => {}
                    _ = shutdown.wait() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}

/// Strip the proxy prefix, leaving the path to append upstream.
fn proxy_suffix(path: &str) -> &str {
    path.strip_prefix(PROXY_PREFIX)
        .unwrap_or(path)
        .trim_start_matches('/')
}

/// Remainder of the suffix when it addresses the governance route.
fn governance_suffix(suffix: &str) -> Option<&str> {
    if suffix == GOVERNANCE_SEGMENT {
        return Some("");
    }
    suffix
        .strip_prefix(GOVERNANCE_SEGMENT)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// Proxy handler: pick the forwarder and relay.
async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let suffix = proxy_suffix(uri.path());

    let (forwarder, path) = match (&state.governance, governance_suffix(suffix)) {
        (Some(governance), Some(rest)) => (governance, rest),
        _ => (&state.dynamic, suffix),
    };

    tracing::debug!(
        method = %method,
        path = %path,
        governance = matches!(forwarder.mode(), AddressingMode::Static { .. }),
        "Proxying request"
    );

    let inbound = InboundRequest::new(method, path, &uri, headers, body);
    forwarder.forward(inbound).await
}
