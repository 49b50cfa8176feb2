use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use prospect_core::{ControlAction, ControlOutcome, Effect, Msg, StreamFailure};
use prospect_engine::{ControlCall, EngineEvent, EngineHandle, StreamError};

/// Executes core effects on the engine and turns engine events back into
/// messages for `update`.
pub struct EffectRunner {
    engine: EngineHandle,
    pending_calls: usize,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            pending_calls: 0,
        }
    }

    /// Returns messages for effects that failed before reaching the engine.
    pub fn enqueue(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut feedback = Vec::new();
        for effect in effects {
            match effect {
                Effect::OpenStream { job_key, input } => match serde_json::to_value(&input) {
                    Ok(body) => {
                        engine_info!(
                            "OpenStream job_key={} records={}",
                            job_key,
                            input.data_items.len()
                        );
                        self.engine.open_stream(job_key, body);
                    }
                    Err(err) => {
                        engine_error!("Could not encode job input: {err}");
                        feedback.push(Msg::StreamFailed {
                            job_key,
                            failure: StreamFailure::Network(format!("invalid job input: {err}")),
                        });
                    }
                },
                Effect::PauseJob { job_key, job_id } => {
                    self.pending_calls += 1;
                    self.engine.pause(job_key, &job_id);
                }
                Effect::CheckResume { job_key, job_id } => {
                    self.pending_calls += 1;
                    self.engine.check_resume(job_key, &job_id);
                }
                Effect::ResumeStream { job_key, job_id } => {
                    engine_info!("ResumeStream job_key={} job_id={}", job_key, job_id);
                    self.engine.resume_stream(job_key, &job_id);
                }
                Effect::TerminateJob { job_key, job_id } => {
                    self.pending_calls += 1;
                    self.engine.terminate(job_key, &job_id);
                }
                Effect::CancelStream { job_key } => self.engine.cancel(job_key),
            }
        }
        feedback
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&mut self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        Some(self.translate(event))
    }

    pub fn try_next_msg(&mut self) -> Option<Msg> {
        let event = self.engine.try_recv()?;
        Some(self.translate(event))
    }

    /// Control calls sent but not yet answered.
    pub fn has_pending_calls(&self) -> bool {
        self.pending_calls > 0
    }

    fn translate(&mut self, event: EngineEvent) -> Msg {
        if matches!(event, EngineEvent::ControlFinished { .. }) {
            self.pending_calls = self.pending_calls.saturating_sub(1);
        }
        map_event(event)
    }
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::StreamMessage { job_key, payload } => Msg::StreamMessage { job_key, payload },
        EngineEvent::StreamCompleted { job_key } => Msg::StreamCompleted { job_key },
        EngineEvent::StreamFailed { job_key, error } => Msg::StreamFailed {
            job_key,
            failure: map_stream_error(error),
        },
        EngineEvent::ControlFinished {
            job_key,
            call,
            result,
        } => {
            let outcome = match result {
                Ok(true) => ControlOutcome::Accepted,
                Ok(false) => ControlOutcome::Declined,
                Err(err) => {
                    engine_warn!("{call} failed for job_key={job_key}: {err}");
                    ControlOutcome::Failed(err.to_string())
                }
            };
            Msg::ControlFinished {
                job_key,
                action: map_call(call),
                outcome,
            }
        }
    }
}

fn map_stream_error(error: StreamError) -> StreamFailure {
    match error {
        StreamError::Timeout => StreamFailure::Timeout,
        other => StreamFailure::Network(other.to_string()),
    }
}

fn map_call(call: ControlCall) -> ControlAction {
    match call {
        ControlCall::Pause => ControlAction::Pause,
        ControlCall::CheckResume => ControlAction::Resume,
        ControlCall::Terminate => ControlAction::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_engine::ControlError;

    #[test]
    fn timeouts_stay_distinct_from_other_failures() {
        assert_eq!(
            map_event(EngineEvent::StreamFailed {
                job_key: 1,
                error: StreamError::Timeout
            }),
            Msg::StreamFailed {
                job_key: 1,
                failure: StreamFailure::Timeout
            }
        );
        let Msg::StreamFailed { failure, .. } = map_event(EngineEvent::StreamFailed {
            job_key: 1,
            error: StreamError::HttpStatus {
                status: 503,
                body: "busy".into(),
            },
        }) else {
            panic!("expected StreamFailed");
        };
        assert_eq!(failure, StreamFailure::Network("http status 503: busy".into()));
    }

    #[test]
    fn resume_check_answer_maps_to_outcome() {
        let declined = map_event(EngineEvent::ControlFinished {
            job_key: 2,
            call: ControlCall::CheckResume,
            result: Ok(false),
        });
        assert_eq!(
            declined,
            Msg::ControlFinished {
                job_key: 2,
                action: ControlAction::Resume,
                outcome: ControlOutcome::Declined
            }
        );

        let failed = map_event(EngineEvent::ControlFinished {
            job_key: 2,
            call: ControlCall::Pause,
            result: Err(ControlError::Timeout),
        });
        assert_eq!(
            failed,
            Msg::ControlFinished {
                job_key: 2,
                action: ControlAction::Pause,
                outcome: ControlOutcome::Failed("timed out".into())
            }
        );
    }
}
