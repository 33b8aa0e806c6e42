//! Error types for request building and execution.
//!
//! # Design
//! Build-time failures (`Encoding`, `InvalidUrl`) surface before any I/O and
//! are never retried. `Network` carries the classified response so callers
//! can still inspect status, headers and body of a rejected call. Only
//! `Network` is retryable; `Cancelled` pre-empts any pending retry.

use std::fmt;

use thiserror::Error;

use crate::charset::Charset;
use crate::response::ResponseView;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a completed call was turned into a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The server answered with a status outside the success range.
    Status,
    /// No HTTP response was received at all.
    NoResponse,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Status => f.write_str("error status"),
            NetworkErrorKind::NoResponse => f.write_str("no response"),
        }
    }
}

/// Errors produced while building, executing or decoding a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The body payload could not be turned into bytes.
    #[error("{strategy} body could not be encoded: {reason}")]
    Encoding { strategy: &'static str, reason: String },

    /// Bytes are not valid text under the given charset. Diagnostic only.
    #[error("bytes are not valid {charset} text")]
    Decoding { charset: Charset },

    /// The composed string does not parse as a URL.
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// An operation was executed without a request attached.
    #[error("no request attached to the operation")]
    MissingEndpoint,

    /// The call completed but was classified as a failure.
    #[error("{kind} from {} {}", .response.method(), .response.url())]
    Network {
        kind: NetworkErrorKind,
        response: Box<ResponseView>,
    },

    /// The request's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// The response body could not be decoded into the expected model.
    #[error("response body is not the expected JSON: {reason}")]
    ParseJson {
        reason: String,
        response: Box<ResponseView>,
    },

    /// No async runtime to run on, or the execution task died.
    #[error("execution runtime failure: {0}")]
    Runtime(String),
}

impl Error {
    /// Whether the retry loop may resubmit after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// The response attached to the error, if the call got that far.
    pub fn response(&self) -> Option<&ResponseView> {
        match self {
            Error::Network { response, .. } | Error::ParseJson { response, .. } => Some(response),
            _ => None,
        }
    }
}
