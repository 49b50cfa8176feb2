use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use serde_json::json;
use url::Url;

use crate::envelope::Envelope;
use crate::settings::EngineSettings;
use crate::types::{control_error_from, ControlError};

/// Obtains a fresh bearer token, e.g. by logging in again.
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, ControlError>;
}

/// Single owner of the bearer token shared by stream and control requests.
///
/// Concurrent callers that all saw the same expired token trigger one refresh;
/// the rest pick up the new value.
pub struct TokenManager {
    token: Mutex<Option<String>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TokenManager {
    pub fn new(initial: Option<String>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            token: Mutex::new(initial),
            refresher: Some(refresher),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// A token that is never refreshed.
    pub fn fixed(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
            refresher: None,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces `stale` with a new token. Returns the current token without
    /// refreshing when another caller already replaced it.
    pub async fn refresh(&self, stale: Option<&str>) -> Result<String, ControlError> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(current) = self.current() {
            if stale != Some(current.as_str()) {
                return Ok(current);
            }
        }
        let Some(refresher) = &self.refresher else {
            return Err(ControlError::Auth("token expired and no refresher is configured".into()));
        };
        let fresh = refresher.refresh().await.inspect_err(|err| {
            engine_warn!("Token refresh failed: {err}");
        })?;
        engine_info!("Bearer token refreshed");
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(fresh.clone());
        Ok(fresh)
    }
}

/// Logs in with `open_id` / `tenant_key` and reads `data.tokenValue`.
pub struct LoginRefresher {
    client: reqwest::Client,
    login_url: Url,
    open_id: String,
    tenant_key: String,
    timeout: Duration,
}

impl LoginRefresher {
    pub fn new(
        settings: &EngineSettings,
        login_url: &str,
        open_id: impl Into<String>,
        tenant_key: impl Into<String>,
    ) -> Result<Self, ControlError> {
        let login_url =
            Url::parse(login_url).map_err(|err| ControlError::InvalidRequest(err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(control_error_from)?;
        Ok(Self {
            client,
            login_url,
            open_id: open_id.into(),
            tenant_key: tenant_key.into(),
            timeout: settings.control_timeout,
        })
    }
}

#[async_trait::async_trait]
impl TokenRefresher for LoginRefresher {
    async fn refresh(&self) -> Result<String, ControlError> {
        let response = self
            .client
            .post(self.login_url.clone())
            .timeout(self.timeout)
            .json(&json!({ "open_id": self.open_id, "tenant_key": self.tenant_key }))
            .send()
            .await
            .map_err(control_error_from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::HttpStatus(status.as_u16()));
        }
        let envelope: Envelope = response.json().await.map_err(control_error_from)?;
        if !envelope.is_success() {
            return Err(ControlError::Auth(format!(
                "login refused (code {}): {}",
                envelope.code,
                envelope.message_or_default()
            )));
        }
        envelope
            .data
            .as_ref()
            .and_then(|data| data.get("tokenValue"))
            .and_then(|value| value.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ControlError::Auth("login response carried no token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self) -> Result<String, ControlError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("token-{n}"))
        }
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_once() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(Some("old".into()), refresher.clone());

        assert_eq!(manager.refresh(Some("old")).await.unwrap(), "token-1");
        // A second caller holding the same stale token gets the new one.
        assert_eq!(manager.refresh(Some("old")).await.unwrap(), "token-1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.current().as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn fixed_manager_cannot_refresh() {
        let manager = TokenManager::fixed(Some("t".into()));
        let err = manager.refresh(Some("t")).await.unwrap_err();
        assert!(matches!(err, ControlError::Auth(_)));
    }
}
