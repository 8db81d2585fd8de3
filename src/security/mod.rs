//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (browser origin allow-list, when enabled)
//!     → headers.rs (strip hop-by-hop, drop client credential when injecting)
//!     → upstream
//!
//! Upstream response:
//!     → headers.rs (strip transport headers)
//!     → client
//! ```
//!
//! # Design Decisions
//! - The injected credential never comes from, nor returns to, the client
//! - No trust in client-supplied framing headers

pub mod cors;
pub mod headers;
