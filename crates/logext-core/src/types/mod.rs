pub mod command;
pub mod event;
pub mod level;
pub mod record;

pub use command::{CommandKind, WriteCommand};
pub use event::{
    ticks_now, ticks_to_datetime, ExceptionInfo, LogEvent, StackFrame, StackPayload,
};
pub use level::LogLevel;
pub use record::{AggregatedRecord, RecordId};
