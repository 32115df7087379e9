use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::utils::backoff::RetryPolicy;

use super::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discourse: DiscourseConfig,
    pub google: GoogleConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync_settings: SyncSettings,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub mappings: Vec<SpaceMappingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscourseConfig {
    pub url: String,
    pub api_key: SecretString,
    pub api_username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,
    /// Ready OAuth bearer token; acquisition happens outside this process.
    pub access_token: SecretString,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub filename: Option<String>,
}

impl DatabaseConfig {
    pub fn sqlite_path(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| "sync_db.sqlite".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u64,
    #[serde(default = "default_webhook_host")]
    pub webhook_host: String,
    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_minutes: default_poll_interval_minutes(),
            webhook_host: default_webhook_host(),
            webhook_port: default_webhook_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            email_domain: default_email_domain(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
        }
    }
}

impl HttpConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_delay: Duration::from_millis(self.retry_max_ms),
        }
    }
}

/// One configured space↔category pair. Without `discourse_category_id` the
/// bridge creates a category named after the space, optionally nested
/// under `discourse_parent_category_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceMappingConfig {
    pub google_space_id: String,
    #[serde(default)]
    pub discourse_category_id: Option<i64>,
    #[serde(default)]
    pub discourse_parent_category_id: Option<i64>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("GCHAT_BRIDGE_DISCOURSE_API_KEY") {
            self.discourse.api_key = SecretString::from(value);
        }
        if let Ok(value) = std::env::var("GCHAT_BRIDGE_DISCOURSE_API_USERNAME") {
            self.discourse.api_username = value;
        }
        if let Ok(value) = std::env::var("GCHAT_BRIDGE_GOOGLE_ACCESS_TOKEN") {
            self.google.access_token = SecretString::from(value);
        }
    }
}

fn default_chat_api_base() -> String {
    "https://chat.googleapis.com/v1".to_string()
}

fn default_poll_interval_minutes() -> u64 {
    5
}

fn default_webhook_host() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_port() -> u16 {
    5000
}

fn default_email_domain() -> String {
    "gchat.local".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_ms() -> u64 {
    500
}

fn default_retry_max_ms() -> u64 {
    30_000
}
