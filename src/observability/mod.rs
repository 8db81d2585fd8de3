//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!     → request spans from tower-http, tagged with x-request-id
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, plain or JSON)
//! ```

pub mod logging;

pub use logging::init_logging;
