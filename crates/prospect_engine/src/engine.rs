use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use serde_json::Value;
use url::Url;

use crate::auth::TokenManager;
use crate::control::{JobControl, ReqwestJobControl, RESUME_ENDPOINT, START_ENDPOINT};
use crate::stream::{ChannelStreamSink, SseClient, StreamHandle, StreamRequest};
use crate::{ControlCall, EngineError, EngineEvent, EngineSettings, JobKey};

enum EngineCommand {
    OpenStream { job_key: JobKey, request: StreamRequest },
    Control { job_key: JobKey, call: ControlCall, job_id: String },
    Cancel { job_key: JobKey },
}

/// Runs streams and control calls on a background Tokio runtime and reports
/// back through [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    start_url: Url,
    resume_url: Url,
    stream_timeout: Option<Duration>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, tokens: Arc<TokenManager>) -> Result<Self, EngineError> {
        let streams = SseClient::new(&settings, tokens.clone())
            .map_err(|err| EngineError::Client(err.to_string()))?;
        let control = ReqwestJobControl::new(settings.clone(), tokens)
            .map_err(|err| EngineError::Client(err.to_string()))?;
        Self::with_parts(settings, streams, Arc::new(control))
    }

    /// Like [`EngineHandle::new`] with a caller-supplied control client.
    pub fn with_parts(
        settings: EngineSettings,
        streams: SseClient,
        control: Arc<dyn JobControl>,
    ) -> Result<Self, EngineError> {
        let start_url = settings.endpoint(START_ENDPOINT)?;
        let resume_url = settings.endpoint(RESUME_ENDPOINT)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let mut active: HashMap<JobKey, StreamHandle> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                active.retain(|_, handle| !handle.is_finished());
                match command {
                    EngineCommand::OpenStream { job_key, request } => {
                        if let Some(previous) = active.remove(&job_key) {
                            previous.cancel();
                        }
                        let sink = Arc::new(ChannelStreamSink::new(job_key, event_tx.clone()));
                        let _guard = runtime.enter();
                        let handle = streams.start(request, sink);
                        active.insert(job_key, handle);
                    }
                    EngineCommand::Control {
                        job_key,
                        call,
                        job_id,
                    } => {
                        let control = control.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = run_control(control.as_ref(), call, &job_id).await;
                            let _ = event_tx.send(EngineEvent::ControlFinished {
                                job_key,
                                call,
                                result,
                            });
                        });
                    }
                    EngineCommand::Cancel { job_key } => {
                        if let Some(handle) = active.remove(&job_key) {
                            engine_debug!("Cancelling stream for job {job_key}");
                            handle.cancel();
                        }
                    }
                }
            }
            for handle in active.values() {
                handle.cancel();
            }
            engine_info!("Engine stopped");
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            start_url,
            resume_url,
            stream_timeout: settings.stream_timeout,
        })
    }

    /// POSTs `body` to the start endpoint and streams its results.
    pub fn open_stream(&self, job_key: JobKey, body: Value) {
        let request =
            StreamRequest::json(self.start_url.clone(), body).with_timeout(self.stream_timeout);
        self.send(EngineCommand::OpenStream { job_key, request });
    }

    /// POSTs the job id to the resume endpoint and streams whatever follows.
    pub fn resume_stream(&self, job_key: JobKey, job_id: &str) {
        let request = StreamRequest::form(
            self.resume_url.clone(),
            vec![("id".to_string(), job_id.to_string())],
        )
        .with_timeout(self.stream_timeout);
        self.send(EngineCommand::OpenStream { job_key, request });
    }

    pub fn pause(&self, job_key: JobKey, job_id: &str) {
        self.control(job_key, ControlCall::Pause, job_id);
    }

    pub fn check_resume(&self, job_key: JobKey, job_id: &str) {
        self.control(job_key, ControlCall::CheckResume, job_id);
    }

    pub fn terminate(&self, job_key: JobKey, job_id: &str) {
        self.control(job_key, ControlCall::Terminate, job_id);
    }

    /// Stops the job's stream without reporting an error for it.
    pub fn cancel(&self, job_key: JobKey) {
        self.send(EngineCommand::Cancel { job_key });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn control(&self, job_key: JobKey, call: ControlCall, job_id: &str) {
        self.send(EngineCommand::Control {
            job_key,
            call,
            job_id: job_id.to_string(),
        });
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_warn!("Engine thread is gone; command dropped");
        }
    }
}

async fn run_control(
    control: &dyn JobControl,
    call: ControlCall,
    job_id: &str,
) -> Result<bool, crate::ControlError> {
    let result = match call {
        ControlCall::Pause => control.pause(job_id).await.map(|()| true),
        ControlCall::CheckResume => control.check_resume(job_id).await,
        ControlCall::Terminate => control.terminate(job_id).await.map(|()| true),
    };
    if let Err(err) = &result {
        engine_warn!("{call} for job {job_id} failed: {err}");
    }
    result
}
