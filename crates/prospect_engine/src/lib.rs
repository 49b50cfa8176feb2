//! Prospect engine: streaming requests, job control calls and persistence.
mod auth;
mod control;
mod engine;
mod envelope;
mod persist;
mod settings;
mod sse;
mod stream;
mod types;

pub use auth::{LoginRefresher, TokenManager, TokenRefresher};
pub use control::{
    JobControl, ReqwestJobControl, CHECK_RESUME_ENDPOINT, PAUSE_ENDPOINT, RESUME_ENDPOINT,
    START_ENDPOINT, TERMINATE_ENDPOINT,
};
pub use engine::EngineHandle;
pub use envelope::{Envelope, CODE_SUCCESS, CODE_TOKEN_EXPIRED};
pub use persist::{ensure_output_dir, sanitize_file_stem, PersistError, ResultStore};
pub use settings::{EngineSettings, DEFAULT_BASE_URL};
pub use sse::{SseFramer, StreamEvent};
pub use stream::{
    ChannelStreamSink, EventStream, RequestBody, SseClient, StreamHandle, StreamRequest,
    StreamSink,
};
pub use types::{ControlCall, ControlError, EngineError, EngineEvent, JobKey, StreamError};
