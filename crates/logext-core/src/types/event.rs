use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::level::LogLevel;
use crate::error::Result;

/// Ticks per second (one tick = 100 ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Current wall-clock time in ticks since the Unix epoch
pub fn ticks_now() -> i64 {
    datetime_to_ticks(Utc::now())
}

pub fn datetime_to_ticks(dt: DateTime<Utc>) -> i64 {
    dt.timestamp() * TICKS_PER_SECOND + i64::from(dt.timestamp_subsec_nanos() / 100)
}

/// Convert ticks back to a UTC timestamp, `None` if out of chrono's range
pub fn ticks_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// A pre-resolved stack frame supplied by the call-site facade
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackFrame {
    /// Declaring type / module of the frame
    #[serde(rename = "scope", default)]
    pub scope: String,

    #[serde(rename = "member", default)]
    pub member: String,

    #[serde(rename = "file", default)]
    pub file: String,

    #[serde(rename = "line", default)]
    pub line: u32,

    /// Whether the frame belongs to the host project (as opposed to a library)
    #[serde(rename = "project", default)]
    pub is_project_code: bool,
}

impl StackFrame {
    pub fn new(
        scope: impl Into<String>,
        member: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        is_project_code: bool,
    ) -> Self {
        Self {
            scope: scope.into(),
            member: member.into(),
            file: file.into(),
            line,
            is_project_code,
        }
    }
}

/// Snapshot of an exception captured by the facade
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type", default)]
    pub type_name: String,

    #[serde(default)]
    pub message: String,

    #[serde(rename = "stack", default)]
    pub stack_text: String,

    #[serde(rename = "inner", default, skip_serializing_if = "Option::is_none")]
    pub inner_message: Option<String>,
}

/// Stack information persisted in the last field of a `$DEF` line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<StackFrame>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
}

impl StackPayload {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.exception.is_none()
    }

    /// Serialize to JSON; an empty payload encodes as an empty string
    pub fn to_json(&self) -> Result<String> {
        if self.is_empty() {
            return Ok(String::new());
        }
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        if json.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

/// One log occurrence as handed over by a producer
///
/// Immutable once ingested; the aggregator consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    /// Pre-formatted payload, opaque to the pipeline
    pub payload: Option<String>,
    pub caller_file: String,
    pub caller_line: u32,
    pub exception: Option<ExceptionInfo>,
    pub frames: Vec<StackFrame>,
    /// Ticks (100 ns) since the Unix epoch
    pub timestamp: i64,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            payload: None,
            caller_file: String::new(),
            caller_line: 0,
            exception: None,
            frames: Vec::new(),
            timestamp: ticks_now(),
        }
    }

    pub fn with_caller(mut self, file: impl Into<String>, line: u32) -> Self {
        self.caller_file = file.into();
        self.caller_line = line;
        self
    }

    /// Attach a payload
    ///
    /// An empty payload is persisted as an empty field and reads back from
    /// a file as `None`.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_timestamp(mut self, ticks: i64) -> Self {
        self.timestamp = ticks;
        self
    }
}
