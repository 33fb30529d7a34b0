//! Configuration types for the Murmur speech pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speech synthesis endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Upstream model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Provider name handed to the credential store
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Directory for the persistent audio cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Maximum number of blobs held in memory
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,

    /// Maximum total bytes held in memory
    #[serde(default = "default_memory_max_bytes")]
    pub memory_max_bytes: usize,

    /// Character budget of the preview unit
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Starting maximum size of the remaining units
    #[serde(default = "default_unit_chars")]
    pub unit_chars: usize,

    #[serde(default = "default_min_unit_chars")]
    pub min_unit_chars: usize,

    #[serde(default = "default_max_unit_chars")]
    pub max_unit_chars: usize,

    /// Adjustment applied per tuning decision
    #[serde(default = "default_unit_chars_step")]
    pub unit_chars_step: usize,

    /// Starting number of in-flight requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_min_concurrency")]
    pub min_concurrency: usize,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Latency samples kept for unit size tuning
    #[serde(default = "default_tuning_window")]
    pub unit_window: usize,

    /// Latency samples kept for concurrency tuning
    #[serde(default = "default_tuning_window")]
    pub concurrency_window: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            provider: default_provider(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_dir: default_cache_dir(),
            memory_max_entries: default_memory_max_entries(),
            memory_max_bytes: default_memory_max_bytes(),
            preview_chars: default_preview_chars(),
            unit_chars: default_unit_chars(),
            min_unit_chars: default_min_unit_chars(),
            max_unit_chars: default_max_unit_chars(),
            unit_chars_step: default_unit_chars_step(),
            concurrency: default_concurrency(),
            min_concurrency: default_min_concurrency(),
            max_concurrency: default_max_concurrency(),
            unit_window: default_tuning_window(),
            concurrency_window: default_tuning_window(),
        }
    }
}

impl SpeechConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject inverted ranges and empty windows.
    pub fn validate(&self) -> Result<()> {
        if self.preview_chars == 0 {
            return Err(Error::ConfigError("preview_chars must be positive".into()));
        }
        if self.min_unit_chars == 0 || self.min_unit_chars > self.max_unit_chars {
            return Err(Error::ConfigError(format!(
                "invalid unit size range {}..={}",
                self.min_unit_chars, self.max_unit_chars
            )));
        }
        if !(self.min_unit_chars..=self.max_unit_chars).contains(&self.unit_chars) {
            return Err(Error::ConfigError(format!(
                "unit_chars {} outside {}..={}",
                self.unit_chars, self.min_unit_chars, self.max_unit_chars
            )));
        }
        if self.min_concurrency == 0 || self.min_concurrency > self.max_concurrency {
            return Err(Error::ConfigError(format!(
                "invalid concurrency range {}..={}",
                self.min_concurrency, self.max_concurrency
            )));
        }
        if !(self.min_concurrency..=self.max_concurrency).contains(&self.concurrency) {
            return Err(Error::ConfigError(format!(
                "concurrency {} outside {}..={}",
                self.concurrency, self.min_concurrency, self.max_concurrency
            )));
        }
        if self.unit_window == 0 || self.concurrency_window == 0 {
            return Err(Error::ConfigError("tuning windows must hold samples".into()));
        }
        Ok(())
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/audio/speech".to_string()
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("murmur")
        .join("audio")
}

fn default_memory_max_entries() -> usize {
    100
}

fn default_memory_max_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_preview_chars() -> usize {
    200
}

fn default_unit_chars() -> usize {
    2000
}

fn default_min_unit_chars() -> usize {
    500
}

fn default_max_unit_chars() -> usize {
    4000
}

fn default_unit_chars_step() -> usize {
    500
}

fn default_concurrency() -> usize {
    2
}

fn default_min_concurrency() -> usize {
    1
}

fn default_max_concurrency() -> usize {
    4
}

fn default_tuning_window() -> usize {
    5
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_cors_enabled(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SpeechConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.preview_chars, 200);
        assert_eq!(config.unit_chars, 2000);
        assert_eq!(config.concurrency, 2);
        assert!(config.cache_dir.ends_with("murmur/audio"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SpeechConfig =
            serde_json::from_str(r#"{"model": "tts-1-hd", "concurrency": 3}"#).unwrap();
        assert_eq!(config.model, "tts-1-hd");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.memory_max_entries, 100);
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        let config = SpeechConfig {
            min_unit_chars: 5000,
            ..SpeechConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let config = SpeechConfig {
            concurrency: 9,
            ..SpeechConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
