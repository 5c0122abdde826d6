//! Lock-free pool of reusable write commands
//!
//! The drain step borrows one [`WriteCommand`] per event and the writer
//! returns it right after serializing it, so steady-state logging allocates
//! no command envelopes.
//!
//! ```ignore
//! let pool = CommandPool::new();
//!
//! let mut cmd = pool.get();
//! cmd.set_inc(42, 1);
//! // ... serialize ...
//! pool.put(cmd);
//! ```

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::WriteCommand;

/// Unbounded free-list of boxed commands
///
/// `get` never blocks and never fails: it pops a recycled command or
/// allocates a fresh one. The pool grows to the high-water mark of commands
/// outstanding at once and never shrinks.
#[derive(Default)]
pub struct CommandPool {
    free: SegQueue<Box<WriteCommand>>,
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub available: usize,
}

impl PoolStatsSnapshot {
    /// Fraction of `get` calls served from the free-list (1.0 when unused)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CommandPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with `count` commands already allocated
    pub fn with_preallocated(count: usize) -> Self {
        let pool = Self::new();
        for _ in 0..count {
            pool.free.push(Box::default());
        }
        pool
    }

    /// Borrow a command
    #[inline]
    pub fn get(&self) -> Box<WriteCommand> {
        match self.free.pop() {
            Some(cmd) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                cmd
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Box::default()
            }
        }
    }

    /// Return a command, releasing its strings first
    #[inline]
    pub fn put(&self, mut cmd: Box<WriteCommand>) {
        cmd.reset();
        self.returns.fetch_add(1, Ordering::Relaxed);
        self.free.push(cmd);
    }

    /// Return every command of a batch
    pub fn put_all(&self, cmds: impl IntoIterator<Item = Box<WriteCommand>>) {
        for cmd in cmds {
            self.put(cmd);
        }
    }

    /// Commands currently sitting in the free-list
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            available: self.free.len(),
        }
    }
}
