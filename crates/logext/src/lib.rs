//! logext: in-process log aggregation and persistence
//!
//! Accepts high-frequency log events from any thread, folds repeats of the
//! same statement into one record, and persists records to rotating local
//! files on a background thread:
//! - **Aggregator**: lock-free ingestion queue with depth-based backpressure
//! - **Command pool**: recycled write commands, no per-event allocation
//! - **Writer**: double-buffered handoff, size rotation, retention sweep
//! - **Reader**: decodes `.logext` files back into records
//!
//! # Quick Start
//!
//! ```no_run
//! use logext::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pipeline = LogPipeline::open(PipelineConfig::new("./logs"))?;
//!
//! pipeline.log(LogEvent::new(LogLevel::Warning, "low health").with_caller("player.rs", 88));
//!
//! // Once per frame, on one thread
//! pipeline.tick();
//!
//! for record in pipeline.snapshot() {
//!     println!("{} x{}", record.message, record.count);
//! }
//!
//! pipeline.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod pipeline;
pub mod prelude;

pub use logext_core::{
    config::{LoggerSettings, PipelineConfig},
    error::{LogextError, Result},
    traits::{CommandBatch, WriteBufferSource},
    types::{
        ticks_now, ticks_to_datetime, AggregatedRecord, CommandKind, ExceptionInfo, LogEvent,
        LogLevel, RecordId, StackFrame, StackPayload, WriteCommand,
    },
    CommandPool, LogSignature, PoolStatsSnapshot,
};

pub use logext_file_log::{
    list_log_files, load_log_file, parse_log, read_log_file, sweep, LoadedLog, LogFileEntry,
    LogFileWriter, SweepStats, WriterConfig, WriterState, WriterStats,
};

pub use aggregator::{Aggregator, AggregatorStats, DEFAULT_QUEUE_CEILING};
pub use pipeline::LogPipeline;
