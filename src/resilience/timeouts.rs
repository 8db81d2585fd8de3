//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for upstream response headers
//! - Cancel the pending upstream call cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future aborts the call
//! - Timeout errors are distinct from other transport errors
//! - Body streaming is not bounded, so long-lived payloads keep flowing

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Run `fut`, giving up after `limit`.
pub async fn with_timeout<F>(limit: Duration, fut: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimeoutError(limit))
}
