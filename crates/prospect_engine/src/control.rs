use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};

use crate::auth::TokenManager;
use crate::envelope::Envelope;
use crate::settings::EngineSettings;
use crate::types::{control_error_from, ControlError};

pub const PAUSE_ENDPOINT: &str = "abort";
pub const CHECK_RESUME_ENDPOINT: &str = "checkResume";
pub const RESUME_ENDPOINT: &str = "resume";
pub const TERMINATE_ENDPOINT: &str = "terminate";
pub const START_ENDPOINT: &str = "start";

/// Non-streaming calls that steer a running job by its server-side id.
#[async_trait::async_trait]
pub trait JobControl: Send + Sync {
    async fn pause(&self, job_id: &str) -> Result<(), ControlError>;
    /// Whether the server still allows the job to continue.
    async fn check_resume(&self, job_id: &str) -> Result<bool, ControlError>;
    async fn terminate(&self, job_id: &str) -> Result<(), ControlError>;
}

#[derive(Clone)]
pub struct ReqwestJobControl {
    client: reqwest::Client,
    settings: EngineSettings,
    tokens: Arc<TokenManager>,
}

impl ReqwestJobControl {
    pub fn new(settings: EngineSettings, tokens: Arc<TokenManager>) -> Result<Self, ControlError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(control_error_from)?;
        Ok(Self {
            client,
            settings,
            tokens,
        })
    }

    async fn post_id(&self, endpoint: &str, job_id: &str) -> Result<Envelope, ControlError> {
        let url = self
            .settings
            .endpoint(endpoint)
            .map_err(|err| ControlError::InvalidRequest(err.to_string()))?;

        let mut bearer = self.tokens.current();
        let mut refreshed = false;
        loop {
            let mut builder = self
                .client
                .post(url.clone())
                .timeout(self.settings.control_timeout)
                .form(&[("id", job_id)]);
            if let Some(token) = bearer.as_deref() {
                builder = builder.bearer_auth(token);
            }
            engine_debug!("POST {url} id={job_id}");
            let response = builder.send().await.map_err(control_error_from)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ControlError::HttpStatus(status.as_u16()));
            }
            let envelope: Envelope = response.json().await.map_err(control_error_from)?;

            if envelope.is_token_expired() && !refreshed {
                engine_info!("{endpoint} hit an expired token; refreshing");
                bearer = Some(self.tokens.refresh(bearer.as_deref()).await?);
                refreshed = true;
                continue;
            }
            if !envelope.is_success() {
                return Err(ControlError::Rejected {
                    code: envelope.code,
                    message: envelope.message_or_default(),
                });
            }
            return Ok(envelope);
        }
    }
}

#[async_trait::async_trait]
impl JobControl for ReqwestJobControl {
    async fn pause(&self, job_id: &str) -> Result<(), ControlError> {
        self.post_id(PAUSE_ENDPOINT, job_id).await.map(|_| ())
    }

    async fn check_resume(&self, job_id: &str) -> Result<bool, ControlError> {
        let envelope = self.post_id(CHECK_RESUME_ENDPOINT, job_id).await?;
        Ok(envelope.data_is_truthy())
    }

    async fn terminate(&self, job_id: &str) -> Result<(), ControlError> {
        self.post_id(TERMINATE_ENDPOINT, job_id).await.map(|_| ())
    }
}
