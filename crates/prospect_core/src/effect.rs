use crate::{JobInput, JobKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the result stream for a new job.
    OpenStream { job_key: JobKey, input: JobInput },
    /// Ask the server to pause the job.
    PauseJob { job_key: JobKey, job_id: String },
    /// Ask the server whether a paused job can continue.
    CheckResume { job_key: JobKey, job_id: String },
    /// Reattach to a job whose stream ended while it was paused.
    ResumeStream { job_key: JobKey, job_id: String },
    /// Best-effort notification that the user terminated the job.
    TerminateJob { job_key: JobKey, job_id: String },
    /// Abort the local stream request.
    CancelStream { job_key: JobKey },
}
