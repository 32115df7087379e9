use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::warn;
use url::Url;

use super::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discourse.url.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "discourse.url cannot be empty".to_string(),
            ));
        }
        if Url::parse(&self.discourse.url).is_err() {
            return Err(ConfigError::InvalidConfig(format!(
                "discourse.url is not a valid URL: {}",
                self.discourse.url
            )));
        }
        if self.discourse.api_key.expose_secret().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "discourse.api_key cannot be empty".to_string(),
            ));
        }
        if self.discourse.api_username.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "discourse.api_username cannot be empty".to_string(),
            ));
        }

        if self.google.access_token.expose_secret().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "google.access_token cannot be empty".to_string(),
            ));
        }

        if self.sync_settings.webhook_port == 0 {
            return Err(ConfigError::InvalidConfig(
                "sync_settings.webhook_port must be between 1 and 65535".to_string(),
            ));
        }
        if self.sync_settings.poll_interval_minutes == 0 {
            return Err(ConfigError::InvalidConfig(
                "sync_settings.poll_interval_minutes must be at least 1".to_string(),
            ));
        }

        for mapping in &self.mappings {
            if mapping.google_space_id.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "mappings entries require a google_space_id".to_string(),
                ));
            }
        }
        if self.mappings.is_empty() {
            warn!("no space mappings defined in configuration");
        }

        Ok(())
    }
}
