use std::time::Duration;

use serde::Deserialize;

use crate::services::{dispatcher::DEFAULT_WORKER_COUNT, workers_ai::DEFAULT_MODEL};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Cloudflare account ID
    pub cf_account_id: String,

    /// Cloudflare Workers AI API token
    pub cf_api_token: String,

    /// Workers AI img2img model identifier
    #[serde(default = "default_transform_model")]
    pub transform_model: String,

    /// Per-request timeout for the transform call, in seconds
    #[serde(default = "default_transform_timeout_secs")]
    pub transform_timeout_secs: u64,

    /// Concurrent transform calls per batch
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Largest accepted source upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// JPEG quality of the composed album (1-100)
    #[serde(default = "default_album_jpeg_quality")]
    pub album_jpeg_quality: u8,

    /// Age after which an idle session and its images are discarded, in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// How often expired sessions are swept, in seconds
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_transform_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_transform_timeout_secs() -> u64 {
    120
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_album_jpeg_quality() -> u8 {
    90
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_session_sweep_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("WORKER_COUNT must be at least 1"));
        }
        if !(1..=100).contains(&self.album_jpeg_quality) {
            return Err(ConfigError::Invalid("ALBUM_JPEG_QUALITY must be between 1 and 100"));
        }
        if self.session_ttl_secs == 0 || self.session_sweep_secs == 0 {
            return Err(ConfigError::Invalid(
                "SESSION_TTL_SECS and SESSION_SWEEP_SECS must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn transform_timeout(&self) -> Duration {
        Duration::from_secs(self.transform_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }
}

/// Settings for the one-shot `batch` binary, read alongside [`AppConfig`].
#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    /// Path of the source photo
    pub batch_input: String,

    /// Directory receiving one file per result plus the album
    #[serde(default = "default_batch_output_dir")]
    pub batch_output_dir: String,

    /// Comma-separated style names; empty runs the whole catalog
    #[serde(default)]
    pub batch_styles: String,
}

fn default_batch_output_dir() -> String {
    "photoshoot-output".to_string()
}

impl BatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Requested style names, trimmed, blanks dropped.
    pub fn style_names(&self) -> Vec<String> {
        self.batch_styles
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config: AppConfig =
            envy::from_iter(vars(&[("CF_ACCOUNT_ID", "acct"), ("CF_API_TOKEN", "tok")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.transform_model, DEFAULT_MODEL);
        assert_eq!(config.transform_timeout(), Duration::from_secs(120));
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
        assert_eq!(config.session_sweep_interval(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config: AppConfig = envy::from_iter(vars(&[
            ("CF_ACCOUNT_ID", "acct"),
            ("CF_API_TOKEN", "tok"),
            ("WORKER_COUNT", "0"),
        ]))
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_session_ttl_rejected() {
        let config: AppConfig = envy::from_iter(vars(&[
            ("CF_ACCOUNT_ID", "acct"),
            ("CF_API_TOKEN", "tok"),
            ("SESSION_TTL_SECS", "0"),
        ]))
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_batch_style_names() {
        let config: BatchConfig = envy::from_iter(vars(&[
            ("BATCH_INPUT", "me.png"),
            ("BATCH_STYLES", " Smiling Portrait, ,Walking Pose "),
        ]))
        .unwrap();
        assert_eq!(config.style_names(), vec!["Smiling Portrait", "Walking Pose"]);
        assert_eq!(config.batch_output_dir, "photoshoot-output");
    }
}
