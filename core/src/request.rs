//! The request descriptor: one HTTP call described as data.
//!
//! # Design
//! A descriptor holds only per-call overrides. Anything it leaves unset
//! (timeout, cache policy, headers) is taken from the service it runs in.
//! Turning it into a wire request is pure and synchronous, so encoding and
//! URL errors are visible before any I/O is issued.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::body::RequestBody;
use crate::compose::compose;
use crate::config::ServiceConfig;
use crate::error::Error;
use crate::http::{has_header, CachePolicy, Headers, Method, Params};
use crate::transport::TransportRequest;

const CONTENT_TYPE: &str = "Content-Type";

/// Description of one HTTP call.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Endpoint template appended to the service base, e.g. `/v2/articles/{id}`.
    pub endpoint: String,
    pub path_params: Params,
    pub query_params: Params,
    pub body: Option<RequestBody>,
    pub headers: Headers,
    pub timeout: Option<Duration>,
    pub cache_policy: Option<CachePolicy>,
    pub cancellation: Option<CancellationToken>,
    /// Runtime to execute on. The ambient runtime is used when unset.
    pub context: Option<Handle>,
}

impl RequestDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    pub fn path_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.insert(key, Some(value.to_string()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.insert(key, Some(value.to_string()));
        self
    }

    pub fn query_params(mut self, params: Params) -> Self {
        self.query_params = params;
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = Some(cache_policy);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn context(mut self, handle: Handle) -> Self {
        self.context = Some(handle);
        self
    }
}

/// Turns a description into the pieces of a wire request.
///
/// `service_headers` are the headers of the service the request runs in;
/// the request's own headers override them key by key.
pub trait Describable {
    fn resolved_headers(&self, service_headers: &Headers) -> Headers;

    fn url_in(&self, config: &ServiceConfig) -> Result<String, Error>;

    fn transport_request(&self, config: &ServiceConfig, service_headers: &Headers) -> Result<TransportRequest, Error>;
}

impl Describable for RequestDescriptor {
    fn resolved_headers(&self, service_headers: &Headers) -> Headers {
        let mut headers = service_headers.clone();
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    fn url_in(&self, config: &ServiceConfig) -> Result<String, Error> {
        compose(config.base(), &self.endpoint, &self.path_params, &self.query_params)
    }

    fn transport_request(&self, config: &ServiceConfig, service_headers: &Headers) -> Result<TransportRequest, Error> {
        let url = self.url_in(config)?;
        let mut headers = self.resolved_headers(service_headers);
        let body = match &self.body {
            Some(body) => {
                let bytes = body.encode()?;
                if let Some(content_type) = body.content_type() {
                    if !has_header(&headers, CONTENT_TYPE) {
                        headers.insert(CONTENT_TYPE.to_string(), content_type);
                    }
                }
                Some(bytes)
            }
            None => None,
        };
        Ok(TransportRequest {
            method: self.method,
            url,
            headers,
            body,
            timeout: self.timeout.unwrap_or(config.timeout()),
            cache_policy: self.cache_policy.unwrap_or(config.cache_policy()),
            cancellation: self.cancellation.clone(),
        })
    }
}
