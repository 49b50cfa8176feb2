use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/data/";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Prefix of the `start` / `abort` / `checkResume` / `resume` /
    /// `terminate` endpoints.
    pub base_url: Url,
    pub connect_timeout: Duration,
    /// Whole-request limit for result streams; `None` waits indefinitely.
    pub stream_timeout: Option<Duration>,
    /// Limit for pause / check-resume / terminate / login calls.
    pub control_timeout: Duration,
    pub user_agent: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            connect_timeout: Duration::from_secs(10),
            stream_timeout: None,
            control_timeout: Duration::from_secs(5),
            user_agent: concat!("prospect/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EngineSettings {
    pub fn with_base_url(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base)?,
            ..Self::default()
        })
    }

    /// Resolves `name` below the base URL, whether or not the base ends in `/`.
    pub fn endpoint(&self, name: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(name.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_with_or_without_trailing_slash() {
        let with = EngineSettings::with_base_url("https://svc.example.com/api/data/").unwrap();
        let without = EngineSettings::with_base_url("https://svc.example.com/api/data").unwrap();
        for settings in [with, without] {
            assert_eq!(
                settings.endpoint("checkResume").unwrap().as_str(),
                "https://svc.example.com/api/data/checkResume"
            );
            assert_eq!(
                settings.endpoint("/start").unwrap().as_str(),
                "https://svc.example.com/api/data/start"
            );
        }
    }
}
