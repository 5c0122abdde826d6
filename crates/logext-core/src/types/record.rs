use serde::{Deserialize, Serialize};

use super::event::{ExceptionInfo, StackFrame};
use super::level::LogLevel;
use crate::signature::LogSignature;

/// Record identifier, strictly increasing from 1 within a session
pub type RecordId = u64;

/// All occurrences of one logical log statement, folded together
///
/// Message, payload, stack and caller are snapshots of the first occurrence;
/// `count` and `last_seen` track every repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub id: RecordId,
    pub signature: LogSignature,
    pub level: LogLevel,
    pub message: String,
    pub payload: Option<String>,
    pub frames: Vec<StackFrame>,
    pub exception: Option<ExceptionInfo>,
    pub caller_file: String,
    pub caller_line: u32,
    pub count: u64,
    /// Ticks of the first occurrence
    pub first_seen: i64,
    /// Ticks of the most recent occurrence
    pub last_seen: i64,
}

impl AggregatedRecord {
    /// Fold one more occurrence into the record
    #[inline]
    pub fn record_repeat(&mut self, amount: u64, timestamp: i64) {
        self.count = self.count.saturating_add(amount);
        if timestamp > self.last_seen {
            self.last_seen = timestamp;
        }
    }

    /// `file:line` as written in `$DEF` lines
    pub fn caller_location(&self) -> String {
        format!("{}:{}", self.caller_file, self.caller_line)
    }
}
