//! Upstream body relay.
//!
//! The upstream response body is wrapped in [`UpstreamBody`] and handed to
//! the outbound response as a stream. Hyper drops the stream when the body is
//! fully written, when a chunk fails, or when the client disconnects; the drop
//! releases the upstream connection on every one of those paths.

use axum::body::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// How the relay ended, recorded when the upstream handle is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Still streaming, or abandoned by the client.
    Open,
    /// Upstream signalled end of body.
    Drained,
    /// Upstream failed mid-body.
    Failed,
}

/// Streaming handle on an upstream response body.
pub struct UpstreamBody {
    inner: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    upstream: String,
    bytes_relayed: u64,
    outcome: RelayOutcome,
}

impl UpstreamBody {
    /// Take ownership of an upstream response and stream its body.
    pub fn new(response: reqwest::Response, upstream: String) -> Self {
        Self::from_stream(response.bytes_stream(), upstream)
    }

    pub fn from_stream<S>(stream: S, upstream: String) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            upstream,
            bytes_relayed: 0,
            outcome: RelayOutcome::Open,
        }
    }

    pub fn bytes_relayed(&self) -> u64 {
        self.bytes_relayed
    }

    pub fn outcome(&self) -> RelayOutcome {
        self.outcome
    }
}

impl Stream for UpstreamBody {
    type Item = Result<Bytes, reqwest::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_relayed += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.outcome = RelayOutcome::Failed;
                tracing::warn!(upstream = %this.upstream, error = %e, "Upstream body failed mid-stream");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.outcome = RelayOutcome::Drained;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for UpstreamBody {
    fn drop(&mut self) {
        match self.outcome {
            RelayOutcome::Drained => tracing::debug!(
                upstream = %self.upstream,
                bytes = self.bytes_relayed,
                "Upstream body relayed"
            ),
            RelayOutcome::Failed => tracing::debug!(
                upstream = %self.upstream,
                bytes = self.bytes_relayed,
                "Upstream connection released after error"
            ),
            RelayOutcome::Open => tracing::debug!(
                upstream = %self.upstream,
                bytes = self.bytes_relayed,
                "Client went away, upstream connection released"
            ),
        }
    }
}
