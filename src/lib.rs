//! Dashboard front-end server with a same-origin reverse proxy.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod security;

pub use config::DashboardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
