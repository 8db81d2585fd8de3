//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder issues upstream call
//!     → timeouts.rs (bounded wait for response headers)
//!     → success: relay response
//!     → expiry: 502 with JSON error
//! ```
//!
//! # Design Decisions
//! - No automatic retries; a retry is the caller's decision
//! - Timeouts are per request, never shared across requests

pub mod timeouts;
