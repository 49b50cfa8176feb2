//! Streaming POST requests answered with Server-Sent Events.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::TokenManager;
use crate::envelope::Envelope;
use crate::settings::EngineSettings;
use crate::sse::{SseFramer, StreamEvent};
use crate::types::{stream_error_from, EngineEvent, JobKey, StreamError};

const ERROR_BODY_LIMIT: usize = 512;

pub type EventStream = BoxStream<'static, Result<StreamEvent, StreamError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub url: Url,
    pub body: RequestBody,
    /// Measured from the moment the request is sent, across the whole body.
    pub timeout: Option<Duration>,
}

impl StreamRequest {
    pub fn json(url: Url, body: Value) -> Self {
        Self {
            url,
            body: RequestBody::Json(body),
            timeout: None,
        }
    }

    pub fn form(url: Url, fields: Vec<(String, String)>) -> Self {
        Self {
            url,
            body: RequestBody::Form(fields),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Receives the outcome of one stream started with [`SseClient::start`].
///
/// Exactly one of `on_error` / `on_complete` is called, unless the stream was
/// cancelled, in which case neither is.
pub trait StreamSink: Send + Sync {
    fn on_message(&self, payload: String);
    fn on_error(&self, error: StreamError);
    fn on_complete(&self);
}

/// Forwards a stream's callbacks as [`EngineEvent`]s tagged with its job key.
pub struct ChannelStreamSink {
    job_key: JobKey,
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelStreamSink {
    pub fn new(job_key: JobKey, tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { job_key, tx }
    }
}

impl StreamSink for ChannelStreamSink {
    fn on_message(&self, payload: String) {
        let _ = self.tx.send(EngineEvent::StreamMessage {
            job_key: self.job_key,
            payload,
        });
    }

    fn on_error(&self, error: StreamError) {
        let _ = self.tx.send(EngineEvent::StreamFailed {
            job_key: self.job_key,
            error,
        });
    }

    fn on_complete(&self) {
        let _ = self.tx.send(EngineEvent::StreamCompleted {
            job_key: self.job_key,
        });
    }
}

/// Cancels a running stream. Dropping the handle leaves the stream running.
pub struct StreamHandle {
    token: CancellationToken,
    /// Held while the final callback runs, so `cancel` cannot land between
    /// the cancelled check and `on_error` / `on_complete`.
    finish_gate: Arc<Mutex<()>>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Idempotent. No error or completion is reported after this returns; a
    /// final callback already in progress is waited for.
    pub fn cancel(&self) {
        let _gate = self.finish_gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the driving task to exit.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[derive(Clone)]
pub struct SseClient {
    client: reqwest::Client,
    tokens: Arc<TokenManager>,
}

impl SseClient {
    pub fn new(settings: &EngineSettings, tokens: Arc<TokenManager>) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(stream_error_from)?;
        Ok(Self { client, tokens })
    }

    /// Sends `request` and returns its events as a stream. Dropping the stream
    /// aborts the request.
    ///
    /// A JSON response is read as an acknowledgment envelope: success yields
    /// an empty stream, anything else [`StreamError::Rejected`]. An expired
    /// token is refreshed once and the request retried.
    pub async fn connect(&self, request: &StreamRequest) -> Result<EventStream, StreamError> {
        let deadline = request.timeout.map(|timeout| Instant::now() + timeout);
        let bearer = self.tokens.current();
        match self.connect_once(request, bearer.as_deref(), deadline).await {
            Err(StreamError::Rejected { code, .. })
                if code == crate::envelope::CODE_TOKEN_EXPIRED =>
            {
                engine_info!("Stream request hit an expired token; refreshing");
                let fresh = within(deadline, self.tokens.refresh(bearer.as_deref()))
                    .await?
                    .map_err(|err| StreamError::Auth(err.to_string()))?;
                self.connect_once(request, Some(&fresh), deadline).await
            }
            other => other,
        }
    }

    async fn connect_once(
        &self,
        request: &StreamRequest,
        bearer: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<EventStream, StreamError> {
        let mut builder = self
            .client
            .post(request.url.clone())
            .header(ACCEPT, "text/event-stream");
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };

        engine_debug!("Opening stream {}", request.url);
        let response = within(deadline, builder.send())
            .await?
            .map_err(stream_error_from)?;

        let status = response.status();
        if !status.is_success() {
            let body = within(deadline, response.text())
                .await?
                .unwrap_or_default();
            return Err(StreamError::HttpStatus {
                status: status.as_u16(),
                body: truncate_at_char_boundary(body, ERROR_BODY_LIMIT),
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_start().starts_with("application/json"))
            .unwrap_or(false);
        if is_json {
            let text = within(deadline, response.text())
                .await?
                .map_err(stream_error_from)?;
            let envelope: Envelope = serde_json::from_str(&text).map_err(|err| {
                StreamError::Network(format!("unreadable acknowledgment: {err}"))
            })?;
            if !envelope.is_success() {
                return Err(StreamError::Rejected {
                    code: envelope.code,
                    message: envelope.message_or_default(),
                });
            }
            engine_debug!("Request acknowledged without a stream");
            return Ok(futures_util::stream::empty().boxed());
        }

        let pump = Pump {
            body: response.bytes_stream().boxed(),
            framer: SseFramer::new(),
            pending: VecDeque::new(),
            deadline,
            done: false,
        };
        Ok(futures_util::stream::unfold(pump, Pump::next_event).boxed())
    }

    /// Drives `request` on the current Tokio runtime and reports to `sink`.
    /// Must be called from within a runtime.
    pub fn start(&self, request: StreamRequest, sink: Arc<dyn StreamSink>) -> StreamHandle {
        let token = CancellationToken::new();
        let client = self.clone();
        let task_token = token.clone();
        let finish_gate = Arc::new(Mutex::new(()));
        let task_gate = Arc::clone(&finish_gate);
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = task_token.cancelled() => None,
                outcome = client.drive(&request, sink.as_ref(), &task_token) => Some(outcome),
            };
            let _gate = task_gate.lock().unwrap_or_else(PoisonError::into_inner);
            if task_token.is_cancelled() {
                engine_debug!("Stream {} cancelled", request.url);
                return;
            }
            match outcome {
                Some(Ok(())) => sink.on_complete(),
                Some(Err(err)) => {
                    engine_warn!("Stream {} failed: {err}", request.url);
                    sink.on_error(err);
                }
                None => {}
            }
        });
        StreamHandle {
            token,
            finish_gate,
            task,
        }
    }

    async fn drive(
        &self,
        request: &StreamRequest,
        sink: &dyn StreamSink,
        token: &CancellationToken,
    ) -> Result<(), StreamError> {
        let mut events = self.connect(request).await?;
        while let Some(event) = events.next().await {
            let event = event?;
            if token.is_cancelled() {
                return Ok(());
            }
            sink.on_message(event.payload);
        }
        Ok(())
    }
}

struct Pump {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    framer: SseFramer,
    pending: VecDeque<StreamEvent>,
    deadline: Option<Instant>,
    done: bool,
}

impl Pump {
    async fn next_event(mut self) -> Option<(Result<StreamEvent, StreamError>, Self)> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some((Ok(event), self));
            }
            if self.done {
                return None;
            }
            match self.next_chunk().await {
                Ok(Some(chunk)) => {
                    let events = self.framer.push(&chunk);
                    self.pending.extend(events);
                }
                Ok(None) => {
                    self.done = true;
                    let events = self.framer.finish();
                    self.pending.extend(events);
                }
                Err(err) => {
                    self.done = true;
                    return Some((Err(err), self));
                }
            }
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, StreamError> {
        let item = within(self.deadline, self.body.next()).await?;
        item.transpose().map_err(stream_error_from)
    }
}

async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Result<F::Output, StreamError> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future)
            .await
            .map_err(|_| StreamError::Timeout),
        None => Ok(future.await),
    }
}

fn truncate_at_char_boundary(mut text: String, limit: usize) -> String {
    if text.len() > limit {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
