use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LogextError;

/// Severity of a log event
///
/// The discriminant is the `levelInt` written to disk, so the ordering
/// `Verbose < Debug < Info < Warning < Error < Fatal < None` is part of the
/// file format.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LogLevel {
    #[default]
    Verbose = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
    /// Filter-only level; nothing is logged at `None`
    None = 6,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::None,
    ];

    /// Integer representation used in `$DEF` lines
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Severities that bypass queue backpressure
    #[inline]
    pub fn is_severe(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::None => "none",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_u8(n)
                .ok_or_else(|| LogextError::Config(format!("unknown log level: {}", s)));
        }
        match s.to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "none" | "off" => Ok(LogLevel::None),
            _ => Err(LogextError::Config(format!("unknown log level: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_matches_severity() {
        assert!(LogLevel::Verbose < LogLevel::Debug);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Fatal < LogLevel::None);
    }

    #[test]
    fn test_int_conversion() {
        for level in LogLevel::ALL {
            assert_eq!(LogLevel::from_u8(level.as_u8()), Some(level));
        }
        assert_eq!(LogLevel::from_u8(7), None);
    }

    #[test]
    fn test_parse_names_and_numbers() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("4".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_severe_levels() {
        assert!(LogLevel::Error.is_severe());
        assert!(LogLevel::Fatal.is_severe());
        assert!(!LogLevel::Warning.is_severe());
    }
}
