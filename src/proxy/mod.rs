//! Reverse proxy subsystem.
//!
//! # Data Flow
//! ```text
//! /proxy/<path>?...
//!     → params.rs (ordered query multi-map)
//!     → target.rs (dynamic or static addressing, upstream URL)
//!     → security::headers (request filter, credential policy)
//!     → forwarder.rs (issue upstream call, map failures)
//!     → stream.rs (relay body, release upstream on every exit)
//! ```
//!
//! # Design Decisions
//! - No cross-request mutable state; the client pool is shared read-only
//! - Upstream status codes are relayed verbatim
//! - Only transport failures become 502

pub mod forwarder;
pub mod params;
pub mod stream;
pub mod target;

pub use forwarder::{Credential, Forwarder, InboundRequest, UpstreamRequest};
pub use params::QueryParams;
pub use target::{AddressingMode, Target, TargetSource};
