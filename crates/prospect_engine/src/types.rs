use std::fmt;

/// Engine-side handle for one job; mirrors the core's job key.
pub type JobKey = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// One framed `data:` payload.
    StreamMessage { job_key: JobKey, payload: String },
    /// The stream reached end of body.
    StreamCompleted { job_key: JobKey },
    /// The stream failed. Never emitted for a cancelled stream.
    StreamFailed { job_key: JobKey, error: StreamError },
    /// A control call returned.
    ControlFinished {
        job_key: JobKey,
        call: ControlCall,
        result: Result<bool, ControlError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCall {
    Pause,
    CheckResume,
    Terminate,
}

impl fmt::Display for ControlCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCall::Pause => write!(f, "pause"),
            ControlCall::CheckResume => write!(f, "check resume"),
            ControlCall::Terminate => write!(f, "terminate"),
        }
    }
}

/// Why a result stream stopped early. Caller cancellation is not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("timed out")]
    Timeout,
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("server refused the request (code {code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("timed out")]
    Timeout,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("server refused the request (code {code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub(crate) fn stream_error_from(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::Timeout;
    }
    if err.is_builder() {
        return StreamError::InvalidRequest(err.to_string());
    }
    StreamError::Network(err.to_string())
}

pub(crate) fn control_error_from(err: reqwest::Error) -> ControlError {
    if err.is_timeout() {
        return ControlError::Timeout;
    }
    if err.is_decode() {
        return ControlError::Decode(err.to_string());
    }
    if err.is_builder() {
        return ControlError::InvalidRequest(err.to_string());
    }
    ControlError::Network(err.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build the http client: {0}")]
    Client(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}
