use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use snafu::ResultExt;
use url::Url;

use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::model::EnrollmentId;
use crate::service::observer::SessionConfig;
use crate::service::remote::{HttpProgressStore, ProgressStore};
use crate::time::deserialize_duration;

const PREFIX: &str = "WATCHTRACK_";

/// Runtime configuration, read from `WATCHTRACK_*` environment variables.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base url of the platform api, e.g. `https://lms.example.com/api`.
    pub api_url: Url,
    /// Bearer token of the learner.
    pub token: SecretString,
    /// Enrollment to track, the first enrollment of the learner when unset.
    #[serde(default)]
    pub enrollment_id: Option<EnrollmentId>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Playback tick periods. The console has no video widget, these only take effect for
    /// callers that build a [SessionManager](crate::service::observer::SessionManager) from
    /// [Config::session].
    #[serde(default = "default_ui_tick", deserialize_with = "deserialize_duration")]
    pub ui_tick: Duration,
    #[serde(default = "default_save_tick", deserialize_with = "deserialize_duration")]
    pub save_tick: Duration,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_ui_tick() -> Duration {
    SessionConfig::default().ui_tick
}

fn default_save_tick() -> Duration {
    SessionConfig::default().save_tick
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::prefixed(PREFIX)
            .from_env::<Config>()
            .context(ConfigLoadSnafu)
    }

    pub fn store(&self) -> Arc<dyn ProgressStore> {
        Arc::new(HttpProgressStore::new(self.api_url.clone()))
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            ui_tick: self.ui_tick,
            save_tick: self.save_tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::prefixed(PREFIX).from_iter(
            vars.iter()
                .map(|(key, value)| (format!("{PREFIX}{key}"), value.to_string())),
        )
    }

    #[test]
    fn defaults() {
        let config = load(&[("API_URL", "https://lms.example.com/api"), ("TOKEN", "abc")]).unwrap();

        assert_eq!(config.api_url.as_str(), "https://lms.example.com/api");
        assert_eq!(config.token.expose_secret(), "abc");
        assert_eq!(config.enrollment_id, None);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.session(), SessionConfig::default());
    }

    #[test]
    fn human_readable_ticks() {
        let config = load(&[
            ("API_URL", "https://lms.example.com/api"),
            ("TOKEN", "abc"),
            ("ENROLLMENT_ID", "enr-7"),
            ("UI_TICK", "500ms"),
            ("SAVE_TICK", "10s"),
        ])
        .unwrap();

        assert_eq!(config.enrollment_id, Some(EnrollmentId("enr-7".to_string())));
        assert_eq!(config.ui_tick, Duration::from_millis(500));
        assert_eq!(config.save_tick, Duration::from_secs(10));
    }

    #[test]
    fn token_is_required() {
        assert!(load(&[("API_URL", "https://lms.example.com/api")]).is_err());
    }

    #[test]
    fn token_is_not_printed() {
        let config = load(&[("API_URL", "https://lms.example.com/api"), ("TOKEN", "abc")]).unwrap();
        assert!(!format!("{config:?}").contains("abc"));
    }
}
