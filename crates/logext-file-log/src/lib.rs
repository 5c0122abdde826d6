//! File persistence for the log pipeline
//!
//! Writes command batches to rotating `.logext` files on a dedicated thread
//! and reads them back for offline inspection.
//!
//! Features:
//! - Compact line format (`$DEF` once per record, `$INC` per repeat)
//! - Size-based rotation with a background retention sweep
//! - Bounded, idempotent shutdown with a final flush
//! - Total reader: malformed lines are skipped, never fatal

pub mod diagnostics;
pub mod format;
pub mod reader;
pub mod retention;
mod writer;

pub use reader::{load_log_file, parse_log, read_log_file, LoadedLog};
pub use retention::{list_log_files, sweep, LogFileEntry, SweepStats};
pub use writer::{LogFileWriter, WriterConfig, WriterState, WriterStats};
