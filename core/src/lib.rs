//! Declarative HTTP request layer.
//!
//! # Overview
//! Callers describe a request as data ([`RequestDescriptor`]): endpoint
//! template, method, path and query parameters, body, headers, timeout and
//! cache policy. A [`Service`] merges that description with its
//! [`ServiceConfig`], hands the composed call to a host-supplied
//! [`Transport`], classifies the result and retries rejections on request.
//!
//! # Design
//! - The crate does no I/O of its own. Transports are injected.
//! - Building the wire request is pure and happens before anything is
//!   spawned, so encoding and URL errors never reach the network.
//! - Execution runs on a tokio runtime (the descriptor's, or the ambient
//!   one) and honours a `CancellationToken` between and during attempts.
//! - Capabilities are traits with one implementation each:
//!   [`Describable`] for descriptors, [`Executable`] for services,
//!   [`Classifiable`] for transport responses.

pub mod body;
pub mod charset;
pub mod compose;
pub mod config;
pub mod error;
pub mod http;
pub mod operation;
pub mod request;
pub mod response;
pub mod service;
pub mod transport;

pub use body::RequestBody;
pub use charset::Charset;
pub use compose::compose;
pub use config::{Manifest, ServiceConfig, DEFAULT_TIMEOUT};
pub use error::{Error, NetworkErrorKind, Result};
pub use http::{CachePolicy, Headers, Method, Params};
pub use operation::{DataOperation, JsonOperation, Operation};
pub use request::{Describable, RequestDescriptor};
pub use response::{Classifiable, Outcome, ResponseView, Timing};
pub use service::{Executable, ResponseFuture, Service};
pub use tokio_util::sync::CancellationToken;
pub use transport::{Transport, TransportRequest, TransportResponse};
