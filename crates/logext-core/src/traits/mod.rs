//! Seam between aggregation and persistence
//!
//! The writer does not know about the aggregator; it only needs something it
//! can periodically take a filled batch of commands from.

use crate::types::WriteCommand;

/// A batch of commands handed from the aggregator to the writer
pub type CommandBatch = Vec<Box<WriteCommand>>;

/// Producer side of the double-buffered write handoff
pub trait WriteBufferSource: Send + Sync {
    /// Exchange the active buffer for the empty standby one
    ///
    /// Returns `None` when nothing is pending. The returned batch is owned
    /// exclusively by the caller until its commands go back to the pool.
    fn swap_write_buffer(&self) -> Option<CommandBatch>;

    /// Hand back an emptied batch so its allocation can serve as the next
    /// standby buffer
    fn recycle_write_buffer(&self, buffer: CommandBatch) {
        drop(buffer);
    }
}
