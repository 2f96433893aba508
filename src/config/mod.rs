use chrono::Duration;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL every `/Auth/*` and `/users/*` path is joined onto.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// JSON file holding the persisted session keys; empty keeps them in memory.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub refresh_threshold_secs: i64,
}

impl AuthConfig {
    /// Window before `exp` in which the token is refreshed proactively.
    pub fn refresh_threshold(&self) -> Result<Duration, ConfigError> {
        let secs = self.refresh_threshold_secs;
        if secs <= 0 {
            return Err(ConfigError::Message(format!(
                "auth.refresh_threshold_secs must be positive, got {}",
                secs
            )));
        }
        Duration::try_seconds(secs).ok_or_else(|| {
            ConfigError::Message(format!("auth.refresh_threshold_secs is out of range: {}", secs))
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_bodies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("environment", "development")?
            .set_default("api.base_url", "http://localhost:5000/api")?
            .set_default("storage.path", ".skillup/session.json")?
            .set_default("auth.refresh_threshold_secs", 300)?
            .set_default("logging.level", "info")?
            .set_default("logging.log_bodies", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `SKILLUP_API__BASE_URL=https://api.skillup.dev` sets `Settings.api.base_url`
            .add_source(
                Environment::with_prefix("skillup")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize::<Settings>()?.validated()
    }

    /// Settings pointed at `base_url` with in-memory storage, for tests and embedding.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", "test")?
            .set_default("api.base_url", base_url)?
            .set_default("storage.path", "")?
            .set_default("auth.refresh_threshold_secs", 300)?
            .set_default("logging.level", "debug")?
            .set_default("logging.log_bodies", true)?
            .build()?
            .try_deserialize::<Settings>()?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        self.auth.refresh_threshold()?;
        Ok(self)
    }

    pub fn uses_memory_storage(&self) -> bool {
        self.storage.path.trim().is_empty()
    }
}
