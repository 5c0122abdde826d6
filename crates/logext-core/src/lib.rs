//! logext core: types and building blocks for the log aggregation pipeline
//!
//! This crate defines the pieces shared by the aggregator and the file writer:
//! - Data model: levels, events, stack frames, aggregated records
//! - Write commands and the lock-free command pool that recycles them
//! - Signature hashing used to fold repeated events into one record
//! - Configuration and runtime settings
//! - The `WriteBufferSource` seam between aggregation and persistence
//!
//! Key properties:
//! - Zero-allocation steady state: write commands are pooled, not allocated per event
//! - Double-buffered handoff: the writer swaps a filled buffer out instead of sharing one
//! - Deterministic identity: file + line + message hash to a stable 64-bit signature

pub mod config;
pub mod error;
pub mod observe;
pub mod pool;
pub mod signature;
pub mod traits;
pub mod types;

pub use config::{LoggerSettings, PipelineConfig};
pub use error::{LogextError, Result};
pub use pool::{CommandPool, PoolStatsSnapshot};
pub use signature::LogSignature;
pub use traits::{CommandBatch, WriteBufferSource};
pub use types::{
    ticks_now, ticks_to_datetime, AggregatedRecord, CommandKind, ExceptionInfo, LogEvent,
    LogLevel, RecordId, StackFrame, StackPayload, WriteCommand,
};
