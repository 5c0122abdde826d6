//! logext prelude
//!
//! ```
//! use logext::prelude::*;
//! ```

// Core types
pub use crate::{AggregatedRecord, LogEvent, LogLevel, LogextError, RecordId, Result};

// Stack capture
pub use crate::{ExceptionInfo, StackFrame};

// Configuration
pub use crate::{LoggerSettings, PipelineConfig};

// Pipeline
pub use crate::LogPipeline;

// Offline reading
pub use crate::{load_log_file, read_log_file, LoadedLog};
