//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, routes)
//!     → request.rs (request ID)
//!     → pages.rs (health stubs, dashboard pages, static assets)
//!     → proxy::forwarder (for /proxy/...)
//!     → response.rs (JSON error mapping)
//!     → Send to client
//! ```

pub mod pages;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::{AppState, HttpServer, ServerError};
