use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::settings::LoggerSettings;
use crate::error::{LogextError, Result};

/// Configuration for a log pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory receiving `.logext` files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Options that may change at runtime
    #[serde(default)]
    pub settings: LoggerSettings,

    /// Queue depth at which events below `Error` are dropped (default: 5000)
    #[serde(default = "default_queue_ceiling")]
    pub queue_ceiling: usize,

    /// Maximum events handled per drain tick (default: 1000)
    #[serde(default = "default_drain_batch_limit")]
    pub drain_batch_limit: usize,

    /// Writer wake-up interval in milliseconds (default: 500)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// How long `stop` waits for the writer thread (default: 1000)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Capacity of the file's write buffer in bytes (default: 8 KiB)
    #[serde(default = "default_write_buffer_capacity")]
    pub write_buffer_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            settings: LoggerSettings::default(),
            queue_ceiling: default_queue_ceiling(),
            drain_batch_limit: default_drain_batch_limit(),
            flush_interval_ms: default_flush_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            write_buffer_capacity: default_write_buffer_capacity(),
        }
    }
}

impl PipelineConfig {
    /// Create a config writing into `log_dir` with default options
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_settings(mut self, settings: LoggerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_queue_ceiling(mut self, ceiling: usize) -> Self {
        self.queue_ceiling = ceiling;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        if self.queue_ceiling == 0 {
            return Err(LogextError::Config("queue_ceiling must be positive".into()));
        }
        if self.drain_batch_limit == 0 {
            return Err(LogextError::Config(
                "drain_batch_limit must be positive".into(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(LogextError::Config(
                "flush_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_queue_ceiling() -> usize {
    5000
}

fn default_drain_batch_limit() -> usize {
    1000
}

fn default_flush_interval_ms() -> u64 {
    500
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}

fn default_write_buffer_capacity() -> usize {
    8 * 1024
}
