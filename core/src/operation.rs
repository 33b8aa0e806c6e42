//! Operations: a request paired with what to make of its response.

use std::future::Future;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::response::ResponseView;
use crate::service::Executable;

/// Executes its request in a service and produces `Output`.
pub trait Operation {
    type Output;

    fn request(&self) -> Option<&RequestDescriptor>;

    fn execute<S: Executable>(&self, service: &S, retry: Option<u32>) -> impl Future<Output = Result<Self::Output, Error>>;
}

/// Yields the raw [`ResponseView`].
#[derive(Debug, Clone, Default)]
pub struct DataOperation {
    pub request: Option<RequestDescriptor>,
}

impl DataOperation {
    pub fn new(request: RequestDescriptor) -> Self {
        Self { request: Some(request) }
    }
}

impl Operation for DataOperation {
    type Output = ResponseView;

    fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    async fn execute<S: Executable>(&self, service: &S, retry: Option<u32>) -> Result<ResponseView, Error> {
        let request = self.request.as_ref().ok_or(Error::MissingEndpoint)?;
        service.execute(request, retry).await
    }
}

/// Decodes the JSON body of a successful response into `T`.
#[derive(Debug, Clone)]
pub struct JsonOperation<T> {
    pub request: Option<RequestDescriptor>,
    output: PhantomData<fn() -> T>,
}

impl<T> JsonOperation<T> {
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            request: Some(request),
            output: PhantomData,
        }
    }
}

impl<T> Default for JsonOperation<T> {
    fn default() -> Self {
        Self {
            request: None,
            output: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Operation for JsonOperation<T> {
    type Output = T;

    fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    async fn execute<S: Executable>(&self, service: &S, retry: Option<u32>) -> Result<T, Error> {
        let request = self.request.as_ref().ok_or(Error::MissingEndpoint)?;
        let response = service.execute(request, retry).await?;
        let body = response.bytes().unwrap_or_default();
        serde_json::from_slice(body).map_err(|e| Error::ParseJson {
            reason: e.to_string(),
            response: Box::new(response),
        })
    }
}
