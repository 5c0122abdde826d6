use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogextError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for LogextError {
    fn from(err: serde_json::Error) -> Self {
        LogextError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LogextError>;
