//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overlay: PORT, DOMINO_* (loader.rs)
//!     → command-line overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → DashboardConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; it is read once at process start
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigOverrides};
pub use schema::{
    CorsConfig, DashboardConfig, DominoConfig, ListenerConfig, ObservabilityConfig, PagesConfig,
    ProxyConfig,
};
