use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_logging::LogDestination;
use log::LevelFilter;
use prospect_engine::{EngineSettings, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};

use crate::cli::RunArgs;

pub const DEFAULT_CONFIG_FILE: &str = "prospect.ron";

/// Settings read from `prospect.ron`; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Login endpoint used to renew an expired token.
    pub login_url: Option<String>,
    pub open_id: Option<String>,
    pub tenant_key: Option<String>,
    pub connect_timeout_ms: u64,
    pub control_timeout_ms: u64,
    pub stream_timeout_ms: Option<u64>,
    pub output_dir: PathBuf,
    pub log_destination: String,
    pub log_level: String,
    pub log_file: PathBuf,
    /// Render coalescing interval.
    pub tick_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            login_url: None,
            open_id: None,
            tenant_key: None,
            connect_timeout_ms: 10_000,
            control_timeout_ms: 5_000,
            stream_timeout_ms: None,
            output_dir: PathBuf::from("output"),
            log_destination: "file".to_string(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("prospect.log"),
            tick_ms: 75,
        }
    }
}

/// Reads `explicit` if given (it must exist), else `./prospect.ron` if
/// present, else defaults.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(AppConfig::default());
            }
            fallback
        }
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&text).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse(text: &str) -> Result<AppConfig> {
    Ok(ron::from_str(text)?)
}

impl AppConfig {
    pub fn apply_run_overrides(&mut self, args: &RunArgs) {
        if let Some(base_url) = &args.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(token) = &args.token {
            self.token = Some(token.clone());
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.stream_timeout_ms = Some(timeout_ms);
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
    }

    pub fn apply_log_overrides(&mut self, destination: Option<&str>, level: Option<&str>) {
        if let Some(destination) = destination {
            self.log_destination = destination.to_string();
        }
        if let Some(level) = level {
            self.log_level = level.to_string();
        }
    }

    pub fn log_destination(&self) -> Result<LogDestination> {
        LogDestination::parse(&self.log_destination)
            .with_context(|| format!("unknown log destination `{}`", self.log_destination))
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(self.log_level.trim())
            .with_context(|| format!("unknown log level `{}`", self.log_level))
    }

    pub fn engine_settings(&self) -> Result<EngineSettings> {
        let mut settings = EngineSettings::with_base_url(&self.base_url)
            .with_context(|| format!("invalid base url `{}`", self.base_url))?;
        settings.connect_timeout = Duration::from_millis(self.connect_timeout_ms);
        settings.control_timeout = Duration::from_millis(self.control_timeout_ms);
        settings.stream_timeout = self.stream_timeout_ms.map(Duration::from_millis);
        Ok(settings)
    }

    /// Login parameters when all three are configured.
    pub fn login(&self) -> Option<(&str, &str, &str)> {
        match (&self.login_url, &self.open_id, &self.tenant_key) {
            (Some(url), Some(open_id), Some(tenant_key)) => {
                Some((url.as_str(), open_id.as_str(), tenant_key.as_str()))
            }
            _ => None,
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse(r#"(base_url: "https://svc.example.com/api/data/", stream_timeout_ms: Some(90000))"#)
            .unwrap();
        assert_eq!(config.base_url, "https://svc.example.com/api/data/");
        assert_eq!(config.stream_timeout_ms, Some(90_000));
        assert_eq!(config.control_timeout_ms, 5_000);
        assert_eq!(config.log_destination, "file");
    }

    #[test]
    fn engine_settings_carry_timeouts() {
        let config = AppConfig {
            stream_timeout_ms: Some(1500),
            control_timeout_ms: 250,
            ..AppConfig::default()
        };
        let settings = config.engine_settings().unwrap();
        assert_eq!(settings.stream_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.control_timeout, Duration::from_millis(250));
        assert!(settings.endpoint("start").unwrap().as_str().ends_with("/api/data/start"));
    }

    #[test]
    fn run_flags_override_file_values() {
        let mut config = AppConfig::default();
        config.apply_run_overrides(&RunArgs {
            input: PathBuf::from("job.json"),
            base_url: Some("http://127.0.0.1:9000/api/data/".into()),
            token: Some("t".into()),
            timeout_ms: Some(30_000),
            output_dir: Some(PathBuf::from("results")),
            no_save: false,
        });
        assert_eq!(config.base_url, "http://127.0.0.1:9000/api/data/");
        assert_eq!(config.token.as_deref(), Some("t"));
        assert_eq!(config.stream_timeout_ms, Some(30_000));
        assert_eq!(config.output_dir, PathBuf::from("results"));
    }

    #[test]
    fn bad_log_settings_are_reported() {
        let mut config = AppConfig::default();
        config.apply_log_overrides(Some("syslog"), Some("loud"));
        assert!(config.log_destination().is_err());
        assert!(config.log_level().is_err());
    }

    #[test]
    fn login_needs_all_three_values() {
        let mut config = AppConfig {
            login_url: Some("https://svc.example.com/api/user/login".into()),
            open_id: Some("ou".into()),
            ..AppConfig::default()
        };
        assert!(config.login().is_none());
        config.tenant_key = Some("tk".into());
        assert!(config.login().is_some());
    }
}
