//! Outcome classification and the response handed back to callers.
//!
//! # Design
//! [`Outcome`] is a pure function of the transport status: the only gate
//! between resolving and rejecting an execution. [`ResponseView`] is built
//! once per completed attempt; its parsed JSON view is computed lazily and
//! cached, while the text view is decoded on every call because the caller
//! picks the charset each time.

use std::sync::OnceLock;
use std::time::Duration;

use crate::charset::Charset;
use crate::http::{Headers, Method};
use crate::transport::TransportResponse;

/// Statuses in `200..299` are a success. 299 itself is not.
const SUCCESS_CODES: std::ops::Range<u16> = 200..299;

/// Tri-state classification of a completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success(u16),
    Error(u16),
    NoResponse,
}

impl Outcome {
    /// Classify a raw status code; `None` means no HTTP response was reached.
    pub fn classify(status: Option<u16>) -> Self {
        match status {
            Some(code) if SUCCESS_CODES.contains(&code) => Outcome::Success(code),
            Some(code) => Outcome::Error(code),
            None => Outcome::NoResponse,
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            Outcome::Success(code) | Outcome::Error(code) => Some(*code),
            Outcome::NoResponse => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Anything that can be classified into an [`Outcome`].
pub trait Classifiable {
    fn outcome(&self) -> Outcome;
}

impl Classifiable for TransportResponse {
    fn outcome(&self) -> Outcome {
        Outcome::classify(self.status)
    }
}

/// Timing of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// From request start to the first response bytes, when the transport knows it.
    pub latency: Option<Duration>,
    /// From request start to completion.
    pub duration: Duration,
}

impl Timing {
    /// Timing known only from the outside: total elapsed time.
    pub fn measured(duration: Duration) -> Self {
        Self {
            latency: None,
            duration,
        }
    }
}

/// The result of one executed request.
#[derive(Debug)]
pub struct ResponseView {
    outcome: Outcome,
    method: Method,
    url: String,
    headers: Headers,
    body: Option<Vec<u8>>,
    timing: Option<Timing>,
    failure: Option<String>,
    json: OnceLock<serde_json::Value>,
}

impl ResponseView {
    pub(crate) fn new(method: Method, url: String, response: TransportResponse) -> Self {
        Self {
            outcome: response.outcome(),
            method,
            url,
            headers: response.headers,
            body: response.body,
            timing: response.timing,
            failure: response.failure,
            json: OnceLock::new(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn status(&self) -> Option<u16> {
        self.outcome.code()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The composed URL that was requested.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive single header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timing(&self) -> Option<Timing> {
        self.timing
    }

    /// Transport-reported reason for a missing response, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Body parsed as JSON, cached after the first call.
    ///
    /// An absent or unparseable body yields `Value::Null` rather than an error.
    pub fn json(&self) -> &serde_json::Value {
        self.json.get_or_init(|| {
            self.body
                .as_deref()
                .and_then(|bytes| serde_json::from_slice(bytes).ok())
                .unwrap_or(serde_json::Value::Null)
        })
    }

    /// Body decoded as text with `charset`; `None` if absent or not valid.
    pub fn text(&self, charset: Charset) -> Option<String> {
        self.body.as_deref().and_then(|bytes| charset.decode(bytes).ok())
    }
}
