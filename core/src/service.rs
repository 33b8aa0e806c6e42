//! The execution engine.
//!
//! # Design
//! `execute` builds the wire request synchronously, so encoding and URL
//! errors fail the returned future without any I/O. Everything after that
//! runs as a spawned task: send, classify, and resubmit on rejection.
//!
//! Retries are sequential and immediate. Every rejection is retried the same
//! way; cancellation is checked before each attempt and raced against the
//! in-flight call, and is never retried.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{Error, NetworkErrorKind, Result};
use crate::http::Headers;
use crate::request::{Describable, RequestDescriptor};
use crate::response::{Outcome, ResponseView, Timing};
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Something that can run a request and hand back its response.
pub trait Executable {
    /// Start executing `request`. With `retry = Some(n)`, a rejected attempt
    /// is resubmitted up to `n` more times.
    fn execute(&self, request: &RequestDescriptor, retry: Option<u32>) -> ResponseFuture;
}

/// A backend: its configuration, session headers and transport.
#[derive(Clone)]
pub struct Service {
    config: Arc<ServiceConfig>,
    headers: Headers,
    transport: Arc<dyn Transport>,
}

impl Service {
    /// Session headers start as a copy of the configuration's headers.
    pub fn new(config: ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        Self::shared(Arc::new(config), transport)
    }

    pub fn shared(config: Arc<ServiceConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            headers: config.headers().clone(),
            config,
            transport,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Headers sent with every request of this service.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }
}

impl Executable for Service {
    fn execute(&self, request: &RequestDescriptor, retry: Option<u32>) -> ResponseFuture {
        let mut wire = match request.transport_request(&self.config, &self.headers) {
            Ok(wire) => wire,
            Err(err) => return ResponseFuture::failed(err),
        };
        let Some(handle) = request.context.clone().or_else(|| Handle::try_current().ok()) else {
            return ResponseFuture::failed(Error::Runtime("no tokio runtime to execute on".into()));
        };

        let cancel = request.cancellation.clone().unwrap_or_default();
        wire.cancellation = Some(cancel.clone());
        let attempts = retry.unwrap_or(0).saturating_add(1);
        let span = info_span!(
            "http_request",
            request_id = %Uuid::new_v4(),
            method = %wire.method,
            url = %wire.url,
        );
        let task = run(Arc::clone(&self.transport), wire, cancel, attempts).instrument(span);
        ResponseFuture::running(handle.spawn(task))
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    wire: TransportRequest,
    cancel: CancellationToken,
    attempts: u32,
) -> Result<ResponseView> {
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            debug!(attempt, "request cancelled before sending");
            return Err(Error::Cancelled);
        }
        debug!(attempt, attempts, "sending request");

        let settled = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(attempt, "request cancelled in flight");
                return Err(Error::Cancelled);
            }
            view = send_once(transport.as_ref(), &wire) => settle(view),
        };

        match settled {
            Ok(view) => {
                debug!(attempt, status = ?view.status(), "request succeeded");
                return Ok(view);
            }
            Err(err) if attempt < attempts => {
                warn!(attempt, attempts, error = %err, "attempt rejected, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// One attempt, bounded by the request timeout. An elapsed timeout counts
/// as no response.
async fn send_once(transport: &dyn Transport, wire: &TransportRequest) -> ResponseView {
    let started = Instant::now();
    let mut response = match tokio::time::timeout(wire.timeout, transport.send(wire.clone())).await {
        Ok(response) => response,
        Err(_) => TransportResponse::unreachable(format!("timed out after {:?}", wire.timeout)),
    };
    if response.timing.is_none() {
        response.timing = Some(Timing::measured(started.elapsed()));
    }
    ResponseView::new(wire.method, wire.url.clone(), response)
}

fn settle(view: ResponseView) -> Result<ResponseView> {
    let kind = match view.outcome() {
        Outcome::Success(_) => return Ok(view),
        Outcome::Error(_) => NetworkErrorKind::Status,
        Outcome::NoResponse => NetworkErrorKind::NoResponse,
    };
    Err(Error::Network {
        kind,
        response: Box::new(view),
    })
}

/// Handle to an execution started by [`Executable::execute`].
///
/// The request runs whether or not this is polled; dropping it detaches
/// the task. Use the request's cancellation token to stop it.
pub struct ResponseFuture {
    state: State,
}

enum State {
    Failed(Option<Error>),
    Running(JoinHandle<Result<ResponseView>>),
}

impl ResponseFuture {
    pub(crate) fn failed(err: Error) -> Self {
        Self {
            state: State::Failed(Some(err)),
        }
    }

    fn running(handle: JoinHandle<Result<ResponseView>>) -> Self {
        Self {
            state: State::Running(handle),
        }
    }
}

impl Future for ResponseFuture {
    type Output = Result<ResponseView>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Failed(err) => Poll::Ready(Err(err
                .take()
                .unwrap_or_else(|| Error::Runtime("response future polled after completion".into())))),
            State::Running(handle) => Pin::new(handle)
                .poll(cx)
                .map(|joined| joined.unwrap_or_else(|e| Err(Error::Runtime(e.to_string())))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::body::RequestBody;
    use crate::charset::Charset;

    /// Replays scripted responses in order, then keeps repeating the last one.
    struct Scripted {
        responses: Mutex<VecDeque<TransportResponse>>,
        calls: AtomicUsize,
        last: Mutex<Option<TransportRequest>>,
    }

    impl Scripted {
        fn new(responses: Vec<TransportResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: TransportRequest) -> TransportResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    /// Never answers.
    #[derive(Default)]
    struct Hanging {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Hanging {
        async fn send(&self, _request: TransportRequest) -> TransportResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    /// Waits on the request's token instead of on the network.
    #[derive(Default)]
    struct Watching {
        saw_token: AtomicBool,
        stopped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for Watching {
        async fn send(&self, request: TransportRequest) -> TransportResponse {
            let Some(token) = request.cancellation else {
                return TransportResponse::unreachable("no token");
            };
            self.saw_token.store(true, Ordering::SeqCst);
            let stopped = Arc::clone(&self.stopped);
            // Detached, like a worker thread the engine cannot drop.
            tokio::spawn(async move {
                token.cancelled().await;
                stopped.store(true, Ordering::SeqCst);
            });
            std::future::pending().await
        }
    }

    fn config() -> ServiceConfig {
        ServiceConfig::new(Some("test"), "http://localhost:3000").unwrap()
    }

    #[tokio::test]
    async fn success_resolves_with_view() {
        let transport = Scripted::new(vec![TransportResponse::from_status(204)]);
        let service = Service::new(config(), transport.clone());
        let view = service.execute(&RequestDescriptor::delete("/todos/1"), None).await.unwrap();
        assert_eq!(view.outcome(), Outcome::Success(204));
        assert_eq!(view.url(), "http://localhost:3000/todos/1");
        assert!(view.timing().is_some());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let transport = Scripted::new(vec![
            TransportResponse::from_status(500),
            TransportResponse::unreachable("connection refused"),
            TransportResponse::from_status(200).with_body(r#"{"ok":true}"#),
        ]);
        let service = Service::new(config(), transport.clone());
        let view = service.execute(&RequestDescriptor::get("/flaky"), Some(2)).await.unwrap();
        assert_eq!(view.outcome(), Outcome::Success(200));
        assert_eq!(view.json()["ok"], true);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn final_rejection_is_surfaced_after_retries() {
        let transport = Scripted::new(vec![TransportResponse::from_status(503)]);
        let service = Service::new(config(), transport.clone());
        let err = service.execute(&RequestDescriptor::get("/down"), Some(2)).await.unwrap_err();
        match err {
            Error::Network { kind, response } => {
                assert_eq!(kind, NetworkErrorKind::Status);
                assert_eq!(response.status(), Some(503));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn zero_or_unset_retry_means_one_attempt() {
        let transport = Scripted::new(vec![TransportResponse::from_status(404)]);
        let service = Service::new(config(), transport.clone());
        assert!(service.execute(&RequestDescriptor::get("/a"), None).await.is_err());
        assert!(service.execute(&RequestDescriptor::get("/a"), Some(0)).await.is_err());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn missing_response_is_no_response_error() {
        let transport = Scripted::new(vec![TransportResponse::unreachable("dns failure")]);
        let service = Service::new(config(), transport);
        let err = service.execute(&RequestDescriptor::get("/"), None).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, Error::Network { kind: NetworkErrorKind::NoResponse, .. }));
        assert_eq!(err.response().and_then(ResponseView::failure), Some("dns failure"));
    }

    #[tokio::test]
    async fn encoding_error_skips_the_transport() {
        let transport = Scripted::new(vec![TransportResponse::from_status(200)]);
        let service = Service::new(config(), transport.clone());
        let request = RequestDescriptor::post("/").body(RequestBody::text_in("日本", Charset::Latin1));
        let err = service.execute(&request, Some(3)).await.unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
        assert!(!err.is_retryable());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn descriptor_headers_win_over_session_headers() {
        let transport = Scripted::new(vec![TransportResponse::from_status(200)]);
        let config = config().with_header("X", "0").with_header("Y", "2");
        let mut service = Service::new(config, transport.clone());
        service.set_header("Z", "3");
        service.execute(&RequestDescriptor::get("/").header("X", "1"), None).await.unwrap();

        let sent = transport.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.headers.len(), 3);
        assert_eq!(sent.headers["X"], "1");
        assert_eq!(sent.headers["Y"], "2");
        assert_eq!(sent.headers["Z"], "3");
        assert!(service.config().headers().get("Z").is_none());
    }

    #[tokio::test]
    async fn cancelling_in_flight_rejects_without_retry() {
        let transport = Arc::new(Hanging::default());
        let service = Service::new(config(), transport.clone());
        let token = CancellationToken::new();
        let request = RequestDescriptor::get("/slow").cancellation(token.clone());

        let pending = service.execute(&request, Some(3));
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let err = pending.await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_observes_the_callers_token() {
        let transport = Arc::new(Watching::default());
        let service = Service::new(config(), transport.clone());
        let token = CancellationToken::new();
        let request = RequestDescriptor::get("/slow").cancellation(token.clone());

        let pending = service.execute(&request, None);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transport.saw_token.load(Ordering::SeqCst));
        token.cancel();

        assert!(matches!(pending.await, Err(Error::Cancelled)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transport.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn transport_gets_a_token_without_one_on_the_request() {
        let transport = Scripted::new(vec![TransportResponse::from_status(200)]);
        let service = Service::new(config(), transport.clone());
        service.execute(&RequestDescriptor::get("/"), None).await.unwrap();

        let sent = transport.last.lock().unwrap().clone().unwrap();
        assert!(sent.cancellation.is_some_and(|t| !t.is_cancelled()));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_call() {
        let transport = Scripted::new(vec![TransportResponse::from_status(200)]);
        let service = Service::new(config(), transport.clone());
        let token = CancellationToken::new();
        token.cancel();
        let err = service
            .execute(&RequestDescriptor::get("/").cancellation(token), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn elapsed_timeout_counts_as_no_response() {
        let transport = Arc::new(Hanging::default());
        let service = Service::new(config(), transport.clone());
        let request = RequestDescriptor::get("/").timeout(Duration::from_millis(10));
        let err = service.execute(&request, Some(1)).await.unwrap_err();
        assert!(matches!(err, Error::Network { kind: NetworkErrorKind::NoResponse, .. }));
        assert!(err.response().and_then(ResponseView::failure).unwrap().contains("timed out"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn runs_on_the_descriptor_context() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let transport = Scripted::new(vec![TransportResponse::from_status(201)]);
        let service = Service::new(config(), transport);
        let request = RequestDescriptor::post("/todos").context(runtime.handle().clone());

        let pending = service.execute(&request, None);
        let view = runtime.block_on(pending).unwrap();
        assert_eq!(view.status(), Some(201));
    }

    #[test]
    fn no_runtime_is_reported() {
        let transport = Scripted::new(vec![TransportResponse::from_status(200)]);
        let service = Service::new(config(), transport);
        let pending = service.execute(&RequestDescriptor::get("/"), None);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = runtime.block_on(pending).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }
}
