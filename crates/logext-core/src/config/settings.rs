use serde::{Deserialize, Serialize};

use crate::error::{LogextError, Result};
use crate::types::LogLevel;

/// Runtime-adjustable logger options
///
/// These can change while the pipeline runs:
/// - `max_file_size_kb` applies at the next size check
/// - `max_history_files` triggers an immediate background retention sweep
/// - `file_prefix` applies at the next rotation
/// - `min_log_level` applies to the next event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Rotation threshold in KiB (default: 2048 = 2 MiB)
    #[serde(default = "default_max_file_size_kb", alias = "MaxFileSizeKB")]
    pub max_file_size_kb: u64,

    /// Number of `.logext` files kept in the log directory (default: 10)
    #[serde(default = "default_max_history_files", alias = "MaxHistoryFiles")]
    pub max_history_files: usize,

    /// File name prefix (default: "log")
    #[serde(default = "default_file_prefix", alias = "FilePrefix")]
    pub file_prefix: String,

    /// Events below this level never reach the pipeline (default: Verbose)
    #[serde(default, alias = "MinLogLevel")]
    pub min_log_level: LogLevel,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            max_file_size_kb: default_max_file_size_kb(),
            max_history_files: default_max_history_files(),
            file_prefix: default_file_prefix(),
            min_log_level: LogLevel::default(),
        }
    }
}

impl LoggerSettings {
    pub fn with_max_file_size_kb(mut self, kb: u64) -> Self {
        self.max_file_size_kb = kb;
        self
    }

    pub fn with_max_history_files(mut self, count: usize) -> Self {
        self.max_history_files = count;
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_min_log_level(mut self, level: LogLevel) -> Self {
        self.min_log_level = level;
        self
    }

    /// Rotation threshold in bytes
    #[inline]
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_kb.saturating_mul(1024)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_size_kb == 0 {
            return Err(LogextError::Config(
                "max_file_size_kb must be positive".into(),
            ));
        }
        if self.max_history_files == 0 {
            return Err(LogextError::Config(
                "max_history_files must be positive".into(),
            ));
        }
        if self.file_prefix.is_empty() {
            return Err(LogextError::Config("file_prefix must not be empty".into()));
        }
        if self
            .file_prefix
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        {
            return Err(LogextError::Config(format!(
                "file_prefix contains a path or reserved character: {}",
                self.file_prefix
            )));
        }
        Ok(())
    }
}

fn default_max_file_size_kb() -> u64 {
    2048
}

fn default_max_history_files() -> usize {
    10
}

fn default_file_prefix() -> String {
    "log".to_string()
}
