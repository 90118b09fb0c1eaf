use crate::error::{JsonTranslatorError, Result};
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default public endpoint of the Google translate web API.
pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Translation endpoint; overridable for self-hosted proxies.
    pub endpoint: String,
    pub batch_size: usize,
    pub separator: String,
    pub batch_delay_ms: u64,
    pub item_delay_ms: u64,
    /// Longest combined batch string sent in a single request.
    pub max_batch_chars: usize,
    pub progress_every: usize,
    pub max_upload_bytes: usize,
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_retries: u32,
    pub counter_file: Option<PathBuf>,
    pub discord_webhook: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: 50,
            separator: " ||| ".to_string(),
            batch_delay_ms: 200,
            item_delay_ms: 300,
            max_batch_chars: 5000,
            progress_every: 10,
            max_upload_bytes: 5 * 1024 * 1024,
            retention_secs: 60 * 60,
            sweep_interval_secs: 10 * 60,
            max_retries: 3,
            counter_file: Some(PathBuf::from("translation_counter.json")),
            discord_webhook: None,
        }
    }
}

impl Config {
    /// Load from the default config file location, then apply env overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_file_path().as_deref())
    }

    /// Load from an explicit file (if it exists), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = path {
            if config_path.exists() {
                let contents = std::fs::read_to_string(config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    JsonTranslatorError::Config(format!(
                        "Failed to parse {}: {}",
                        config_path.display(),
                        e
                    ))
                })?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }
        if let Ok(webhook) = std::env::var("DISCORD_WEBHOOK") {
            if !webhook.trim().is_empty() {
                self.discord_webhook = Some(webhook);
            }
        }
        if let Ok(size) = std::env::var("JSON_TRANSLATOR_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                self.batch_size = s;
            }
        }
        if let Ok(path) = std::env::var("JSON_TRANSLATOR_COUNTER_FILE") {
            self.counter_file = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Ok(endpoint) = std::env::var("JSON_TRANSLATOR_ENDPOINT") {
            self.endpoint = endpoint;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(JsonTranslatorError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.separator.trim().is_empty() {
            return Err(JsonTranslatorError::Config(
                "separator must contain a non-whitespace token".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(JsonTranslatorError::Config(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(JsonTranslatorError::Config(
                "sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.progress_every == 0 {
            return Err(JsonTranslatorError::Config(
                "progress_every must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            batch_size: self.batch_size,
            separator: self.separator.clone(),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            item_delay: Duration::from_millis(self.item_delay_ms),
            max_batch_chars: self.max_batch_chars,
            progress_every: self.progress_every,
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("json-translator").join("config.toml"))
    }
}
