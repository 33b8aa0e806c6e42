//! Transport collaborator: the host-supplied component that performs I/O.
//!
//! # Design
//! The crate never opens a socket. It hands a fully composed
//! [`TransportRequest`] to a [`Transport`] and classifies whatever comes
//! back. A transport reports connectivity failures as a response without a
//! status rather than as an error, so that every completed attempt can be
//! classified the same way.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::http::{CachePolicy, Headers, Method};
use crate::response::Timing;

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub cache_policy: CachePolicy,
    /// Cancelled when the caller gives up on the request. Always set when the
    /// request comes from a `Service`.
    pub cancellation: Option<CancellationToken>,
}

/// Whatever the transport got back.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// `None` when no HTTP response was received.
    pub status: Option<u16>,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timing: Option<Timing>,
    /// Why no response was received, for diagnostics.
    pub failure: Option<String>,
}

impl TransportResponse {
    pub fn from_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A call that never reached an HTTP response.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Performs one HTTP call.
///
/// The engine drops the returned future once the request is cancelled. A
/// transport whose work outlives that future (a blocking client on a worker
/// thread, say) must watch `request.cancellation` and stop on its own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> TransportResponse;
}
