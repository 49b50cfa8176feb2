use crate::{ControlAction, JobInput, JobKey, SortKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User submitted records for analysis.
    StartRequested(JobInput),
    /// User clicked Pause.
    PauseRequested,
    /// User clicked Resume.
    ResumeRequested,
    /// User clicked Terminate, or left the page while the job ran.
    TerminateRequested,
    /// User picked a display ordering.
    SortChanged(SortKey),
    /// User edited the name search box.
    SearchChanged(String),
    /// One framed `data:` payload from the result stream.
    StreamMessage { job_key: JobKey, payload: String },
    /// The result stream ended normally.
    StreamCompleted { job_key: JobKey },
    /// The result stream failed. Never sent for caller cancellation.
    StreamFailed {
        job_key: JobKey,
        failure: StreamFailure,
    },
    /// A pause / resume / terminate control call returned.
    ControlFinished {
        job_key: JobKey,
        action: ControlAction,
        outcome: ControlOutcome,
    },
    /// Render tick from the driver loop; changes nothing.
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    /// The configured request timeout expired.
    Timeout,
    /// Transport error or non-success status.
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The server acknowledged the call (for resume checks: resumable).
    Accepted,
    /// The call succeeded but the server said no.
    Declined,
    /// The call itself failed; retryable.
    Failed(String),
}
