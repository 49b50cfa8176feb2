use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::event::{classify, JobEvent};
use crate::{
    AppState, ControlAction, ControlOutcome, Effect, JobKey, JobStatus, Msg, Notice, StreamFailure,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested(input) => {
            if state.has_active_job() {
                state.set_notice(Notice::warning("an analysis job is already running"));
                return (state, Vec::new());
            }
            let job_key = state.begin_job(input.expected_total());
            vec![Effect::OpenStream { job_key, input }]
        }
        Msg::PauseRequested => request_pause(&mut state),
        Msg::ResumeRequested => request_resume(&mut state),
        Msg::TerminateRequested => terminate(&mut state),
        Msg::SortChanged(sort) => {
            state.set_sort(sort);
            Vec::new()
        }
        Msg::SearchChanged(query) => {
            state.set_query(query.trim().to_string());
            Vec::new()
        }
        Msg::StreamMessage { job_key, payload } => {
            apply_payload(&mut state, job_key, &payload);
            Vec::new()
        }
        Msg::StreamCompleted { job_key } => {
            stream_ended(&mut state, job_key, None);
            Vec::new()
        }
        Msg::StreamFailed { job_key, failure } => {
            stream_ended(&mut state, job_key, Some(failure));
            Vec::new()
        }
        Msg::ControlFinished {
            job_key,
            action,
            outcome,
        } => control_finished(&mut state, job_key, action, outcome),
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn apply_payload(state: &mut AppState, job_key: JobKey, payload: &str) {
    match classify(payload) {
        Ok(JobEvent::JobId(job_id)) => state.apply_job_id(job_key, job_id),
        Ok(JobEvent::Record(record)) => state.upsert_record(job_key, record),
        Ok(JobEvent::Unrecognized(value)) => {
            engine_debug!("Job {} ignoring unrecognized payload: {}", job_key, value);
        }
        Err(err) => {
            engine_warn!("Job {} skipping malformed payload ({}): {}", job_key, err, payload);
        }
    }
}

fn request_pause(state: &mut AppState) -> Vec<Effect> {
    let notice = match state.job_mut() {
        Some(job) if job.status == JobStatus::Running && job.pending_control.is_none() => {
            match job.job_id.clone() {
                Some(job_id) => {
                    job.pending_control = Some(ControlAction::Pause);
                    return vec![Effect::PauseJob {
                        job_key: job.key,
                        job_id,
                    }];
                }
                None => Notice::warning("job id not yet known, cannot pause"),
            }
        }
        Some(job) if job.pending_control.is_some() => {
            Notice::warning("a control request is already in progress")
        }
        Some(job) if job.status == JobStatus::Starting => {
            Notice::warning("job id not yet known, cannot pause")
        }
        _ => Notice::warning("no running job to pause"),
    };
    state.set_notice(notice);
    Vec::new()
}

fn request_resume(state: &mut AppState) -> Vec<Effect> {
    let notice = match state.job_mut() {
        Some(job) if job.status == JobStatus::Paused && job.pending_control.is_none() => {
            match job.job_id.clone() {
                Some(job_id) => {
                    job.pending_control = Some(ControlAction::Resume);
                    return vec![Effect::CheckResume {
                        job_key: job.key,
                        job_id,
                    }];
                }
                None => Notice::warning("job id not yet known, cannot resume"),
            }
        }
        Some(job) if job.pending_control.is_some() => {
            Notice::warning("a control request is already in progress")
        }
        _ => Notice::warning("no paused job to resume"),
    };
    state.set_notice(notice);
    Vec::new()
}

fn terminate(state: &mut AppState) -> Vec<Effect> {
    let Some(job) = state.job_mut() else {
        return Vec::new();
    };
    if job.status.is_terminal() {
        return Vec::new();
    }

    engine_info!("Job {} terminated by user in {:?}", job.key, job.status);
    job.status = JobStatus::Terminated;
    job.pending_control = None;
    let job_key = job.key;
    let mut effects = Vec::with_capacity(2);
    if let Some(job_id) = job.job_id.clone() {
        effects.push(Effect::TerminateJob { job_key, job_id });
    }
    effects.push(Effect::CancelStream { job_key });

    let message = if state.processed() > 0 {
        "analysis terminated, processed results are kept"
    } else {
        "analysis terminated, no records were processed"
    };
    state.set_notice(Notice::info(message));
    effects
}

fn stream_ended(state: &mut AppState, job_key: JobKey, failure: Option<StreamFailure>) {
    let processed = state.processed();
    let Some(job) = state.current_job_mut(job_key) else {
        return;
    };
    if job.status.is_terminal() {
        return;
    }
    job.stream_open = false;

    // A stream that delivered every record completes the job even while paused.
    let delivered_all = failure.is_none() && processed >= job.total;
    if job.status == JobStatus::Paused && !delivered_all {
        engine_info!("Job {} stream closed while paused ({:?})", job_key, failure);
        state.mark_dirty();
        return;
    }

    let notice = match failure {
        Some(StreamFailure::Timeout) => {
            engine_warn!("Job {} stream timed out after {} records", job_key, processed);
            job.status = JobStatus::Failed;
            Notice::error("connection timed out")
        }
        Some(StreamFailure::Network(message)) => {
            engine_warn!("Job {} stream failed: {}", job_key, message);
            job.status = JobStatus::Failed;
            Notice::error("network error")
        }
        None if delivered_all => {
            engine_info!("Job {} completed with {} records", job_key, processed);
            job.status = JobStatus::Completed;
            job.pending_control = None;
            Notice::info("analysis complete")
        }
        None => {
            engine_warn!(
                "Job {} stream ended after {} of {} records",
                job_key,
                processed,
                job.total
            );
            job.status = JobStatus::Failed;
            Notice::error("stream ended before all records were processed")
        }
    };
    state.set_notice(notice);
}

fn control_finished(
    state: &mut AppState,
    job_key: JobKey,
    action: ControlAction,
    outcome: ControlOutcome,
) -> Vec<Effect> {
    let Some(job) = state.current_job_mut(job_key) else {
        return Vec::new();
    };
    if job.pending_control == Some(action) {
        job.pending_control = None;
    }

    let (notice, effects) = match (action, outcome) {
        (ControlAction::Terminate, outcome) => {
            match outcome {
                ControlOutcome::Failed(err) => {
                    engine_warn!("Job {} terminate notification failed: {}", job_key, err);
                }
                _ => engine_info!("Job {} terminate acknowledged", job_key),
            }
            return Vec::new();
        }
        (_, _) if job.status.is_terminal() => return Vec::new(),
        (ControlAction::Pause, ControlOutcome::Accepted) if job.status == JobStatus::Running => {
            job.status = JobStatus::Paused;
            (Notice::info("analysis paused, resume at any time"), Vec::new())
        }
        (ControlAction::Pause, ControlOutcome::Accepted) => return Vec::new(),
        (ControlAction::Pause, ControlOutcome::Declined) => {
            (Notice::warning("pause was refused, please retry"), Vec::new())
        }
        (ControlAction::Pause, ControlOutcome::Failed(err)) => {
            engine_warn!("Job {} pause failed: {}", job_key, err);
            (Notice::warning("pause failed, please retry"), Vec::new())
        }
        (ControlAction::Resume, ControlOutcome::Accepted) if job.status == JobStatus::Paused => {
            job.status = JobStatus::Running;
            let mut effects = Vec::new();
            if !job.stream_open {
                if let Some(job_id) = job.job_id.clone() {
                    job.stream_open = true;
                    effects.push(Effect::ResumeStream { job_key, job_id });
                }
            }
            (Notice::info("analysis resumed"), effects)
        }
        (ControlAction::Resume, ControlOutcome::Accepted) => return Vec::new(),
        (ControlAction::Resume, ControlOutcome::Declined) => {
            (Notice::warning("job can no longer be resumed"), Vec::new())
        }
        (ControlAction::Resume, ControlOutcome::Failed(err)) => {
            engine_warn!("Job {} resume check failed: {}", job_key, err);
            (Notice::warning("resume failed, please retry"), Vec::new())
        }
    };
    state.set_notice(notice);
    effects
}
