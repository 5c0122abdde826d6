//! Event aggregation and the write-buffer handoff
//!
//! Producers push events onto a lock-free queue. One drain thread folds them
//! into records keyed by signature and stages a `$DEF` (first occurrence) or
//! `$INC` (repeat) command for each. Staged commands land in the active write
//! buffer, which the writer exchanges for the empty standby buffer.
//!
//! Locks:
//! - `state`: signature index and display list (drain, snapshot, clear)
//! - `buffers`: the active/standby pair (held only to append or swap)

use crossbeam::queue::SegQueue;
use logext_core::{
    observe, AggregatedRecord, CommandBatch, CommandPool, LogEvent, LogSignature, RecordId,
    StackPayload, WriteBufferSource,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Default queue depth at which low-severity events are dropped
pub const DEFAULT_QUEUE_CEILING: usize = 5000;

/// Signature index and display list, always mutated together
struct AggregatorState {
    index: HashMap<LogSignature, usize>,
    records: Vec<AggregatedRecord>,
    next_id: RecordId,
}

impl AggregatorState {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            records: Vec::new(),
            next_id: 1,
        }
    }
}

#[derive(Default)]
struct WriteBuffers {
    active: CommandBatch,
    standby: CommandBatch,
}

#[derive(Debug, Default)]
struct AggregatorCounters {
    ingested: AtomicU64,
    dropped: AtomicU64,
    drained: AtomicU64,
    created: AtomicU64,
}

/// Point-in-time aggregator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Events accepted onto the queue
    pub ingested: u64,
    /// Events rejected by backpressure
    pub dropped: u64,
    /// Events folded into records
    pub drained: u64,
    /// Records created since start (not reset by `clear`)
    pub records_created: u64,
    pub queue_depth: usize,
    pub record_count: usize,
}

/// Deduplicating aggregator feeding the file writer
pub struct Aggregator {
    queue: SegQueue<LogEvent>,
    queue_ceiling: usize,
    state: Mutex<AggregatorState>,
    buffers: Mutex<WriteBuffers>,
    /// Per-drain staging area; its lock also serializes drain callers
    staging: Mutex<CommandBatch>,
    pool: Arc<CommandPool>,
    counters: AggregatorCounters,
}

impl Aggregator {
    pub fn new(pool: Arc<CommandPool>, queue_ceiling: usize) -> Self {
        Self {
            queue: SegQueue::new(),
            queue_ceiling,
            state: Mutex::new(AggregatorState::new()),
            buffers: Mutex::new(WriteBuffers::default()),
            staging: Mutex::new(Vec::new()),
            pool,
            counters: AggregatorCounters::default(),
        }
    }

    /// Queue an event from any thread
    ///
    /// Never blocks. Once the queue holds `queue_ceiling` events, anything
    /// below `Error` is dropped and `false` is returned.
    pub fn ingest(&self, event: LogEvent) -> bool {
        if !event.level.is_severe() && self.queue.len() >= self.queue_ceiling {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            observe::record_ingest(false);
            return false;
        }

        self.queue.push(event);
        self.counters.ingested.fetch_add(1, Ordering::Relaxed);
        observe::record_ingest(true);
        true
    }

    /// Fold up to `batch_limit` queued events into records
    ///
    /// Meant to run on one designated thread; concurrent callers are
    /// serialized. Returns the number of events processed.
    pub fn drain(&self, batch_limit: usize) -> usize {
        let started = Instant::now();
        let mut staged = self.staging.lock();
        let mut processed = 0usize;
        let mut created = 0u64;

        while processed < batch_limit {
            let Some(event) = self.queue.pop() else {
                break;
            };
            processed += 1;
            if self.fold(event, &mut staged) {
                created += 1;
            }
        }

        if !staged.is_empty() {
            self.buffers.lock().active.append(&mut staged);
        }

        if processed > 0 {
            self.counters
                .drained
                .fetch_add(processed as u64, Ordering::Relaxed);
            self.counters.created.fetch_add(created, Ordering::Relaxed);
            observe::record_drain(started.elapsed(), processed as u64, created);
            tracing::trace!(processed, created, "drained log events");
        }
        observe::set_queue_depth(self.queue.len());
        processed
    }

    /// Fold one event, staging its command; returns true for a new record
    fn fold(&self, event: LogEvent, staged: &mut CommandBatch) -> bool {
        let signature = LogSignature::compute(&event.caller_file, event.caller_line, &event.message);
        let mut state = self.state.lock();

        if let Some(pos) = state.index.get(&signature).copied() {
            let record = &mut state.records[pos];
            record.record_repeat(1, event.timestamp);
            let id = record.id;
            drop(state);

            let mut cmd = self.pool.get();
            cmd.set_inc(id, 1);
            staged.push(cmd);
            return false;
        }

        let id = state.next_id;
        state.next_id += 1;

        let LogEvent {
            level,
            message,
            payload,
            caller_file,
            caller_line,
            exception,
            frames,
            timestamp,
        } = event;

        let stack = StackPayload { frames, exception };
        let stack_json = stack.to_json().unwrap_or_else(|e| {
            tracing::warn!(id, error = %e, "failed to serialize stack payload");
            String::new()
        });

        let mut cmd = self.pool.get();
        cmd.set_def(
            id,
            level,
            timestamp,
            &message,
            payload.as_deref(),
            &caller_file,
            caller_line,
            stack_json,
        );

        let pos = state.records.len();
        state.records.push(AggregatedRecord {
            id,
            signature,
            level,
            message,
            payload,
            frames: stack.frames,
            exception: stack.exception,
            caller_file,
            caller_line,
            count: 1,
            first_seen: timestamp,
            last_seen: timestamp,
        });
        state.index.insert(signature, pos);
        drop(state);

        staged.push(cmd);
        true
    }

    /// Copy of the display list, in creation order
    pub fn snapshot(&self) -> Vec<AggregatedRecord> {
        self.state.lock().records.clone()
    }

    /// Forget every record and restart ids at 1
    ///
    /// Queued events and pending write buffers are left alone.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let cleared = state.records.len();
        state.index.clear();
        state.records.clear();
        state.next_id = 1;
        drop(state);
        tracing::info!(cleared, "cleared aggregated records");
    }

    /// Events waiting to be drained
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_ceiling(&self) -> usize {
        self.queue_ceiling
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Commands staged for the writer but not yet swapped out
    pub fn pending_commands(&self) -> usize {
        self.buffers.lock().active.len()
    }

    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            ingested: self.counters.ingested.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            drained: self.counters.drained.load(Ordering::Relaxed),
            records_created: self.counters.created.load(Ordering::Relaxed),
            queue_depth: self.queue_depth(),
            record_count: self.record_count(),
        }
    }
}

impl WriteBufferSource for Aggregator {
    fn swap_write_buffer(&self) -> Option<CommandBatch> {
        let mut buffers = self.buffers.lock();
        if buffers.active.is_empty() {
            return None;
        }
        let standby = mem::take(&mut buffers.standby);
        Some(mem::replace(&mut buffers.active, standby))
    }

    fn recycle_write_buffer(&self, mut buffer: CommandBatch) {
        if !buffer.is_empty() {
            self.pool.put_all(buffer.drain(..));
        }
        let mut buffers = self.buffers.lock();
        if buffer.capacity() > buffers.standby.capacity() {
            buffers.standby = buffer;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logext_core::{CommandKind, ExceptionInfo, LogLevel, StackFrame};

    fn aggregator(ceiling: usize) -> Aggregator {
        Aggregator::new(Arc::new(CommandPool::new()), ceiling)
    }

    fn event(level: LogLevel, file: &str, line: u32, message: &str) -> LogEvent {
        LogEvent::new(level, message).with_caller(file, line)
    }

    fn kinds(batch: &CommandBatch) -> Vec<(CommandKind, RecordId)> {
        batch.iter().map(|c| (c.kind, c.id)).collect()
    }

    #[test]
    fn test_repeats_fold_into_one_record() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        for ts in 1..=3 {
            agg.ingest(event(LogLevel::Info, "a.rs", 7, "same").with_timestamp(ts * 10));
        }
        assert_eq!(agg.drain(100), 3);

        let records = agg.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].count, 3);
        assert_eq!(records[0].first_seen, 10);
        assert_eq!(records[0].last_seen, 30);

        let batch = agg.swap_write_buffer().unwrap();
        assert_eq!(
            kinds(&batch),
            vec![
                (CommandKind::Def, 1),
                (CommandKind::Inc, 1),
                (CommandKind::Inc, 1)
            ]
        );
        assert!(batch[1..].iter().all(|c| c.amount == 1));
    }

    #[test]
    fn test_distinct_signatures_get_increasing_ids() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.ingest(event(LogLevel::Info, "a.rs", 2, "m"));
        agg.ingest(event(LogLevel::Info, "b.rs", 1, "m"));
        agg.ingest(event(LogLevel::Info, "a.rs", 1, "other"));
        agg.drain(100);

        let ids: Vec<_> = agg.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_level_is_not_part_of_identity() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.ingest(event(LogLevel::Error, "a.rs", 1, "m"));
        agg.drain(100);

        let records = agg.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[0].count, 2);
    }

    #[test]
    fn test_drain_respects_batch_limit() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        for i in 0..10 {
            agg.ingest(event(LogLevel::Debug, "a.rs", i, "m"));
        }
        assert_eq!(agg.drain(4), 4);
        assert_eq!(agg.queue_depth(), 6);
        assert_eq!(agg.drain(100), 6);
        assert_eq!(agg.drain(100), 0);
    }

    #[test]
    fn test_backpressure_boundary() {
        let agg = aggregator(3);
        for i in 0..3 {
            assert!(agg.ingest(event(LogLevel::Info, "a.rs", i, "m")));
        }
        assert!(!agg.ingest(event(LogLevel::Debug, "a.rs", 9, "dropped")));
        assert!(!agg.ingest(event(LogLevel::Warning, "a.rs", 9, "dropped")));
        assert!(agg.ingest(event(LogLevel::Error, "a.rs", 9, "kept")));
        assert!(agg.ingest(event(LogLevel::Fatal, "a.rs", 9, "kept too")));

        let stats = agg.stats();
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.ingested, 5);
        assert_eq!(stats.queue_depth, 5);

        agg.drain(100);
        assert!(agg.ingest(event(LogLevel::Debug, "a.rs", 9, "room again")));
    }

    #[test]
    fn test_swap_returns_none_when_empty() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        assert!(agg.swap_write_buffer().is_none());

        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.drain(10);
        assert_eq!(agg.pending_commands(), 1);
        assert_eq!(agg.swap_write_buffer().map(|b| b.len()), Some(1));
        assert!(agg.swap_write_buffer().is_none());
    }

    #[test]
    fn test_recycled_buffer_becomes_standby() {
        let pool = Arc::new(CommandPool::new());
        let agg = Aggregator::new(pool.clone(), DEFAULT_QUEUE_CEILING);
        for i in 0..64 {
            agg.ingest(event(LogLevel::Info, "a.rs", i, "m"));
        }
        agg.drain(100);

        let mut batch = agg.swap_write_buffer().unwrap();
        let capacity = batch.capacity();
        pool.put_all(batch.drain(..));
        agg.recycle_write_buffer(batch);

        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.drain(10);
        agg.swap_write_buffer().unwrap();
        assert_eq!(agg.buffers.lock().active.capacity(), capacity);
        assert_eq!(pool.available(), 64 - 1);
    }

    #[test]
    fn test_def_carries_stack_json() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        let frames = vec![StackFrame::new("Game", "update", "game.rs", 12, true)];
        let exception = ExceptionInfo {
            type_name: "NullRef".into(),
            message: "boom".into(),
            ..Default::default()
        };
        agg.ingest(
            event(LogLevel::Error, "game.rs", 12, "crash")
                .with_payload("{\"hp\":0}")
                .with_frames(frames.clone())
                .with_exception(exception.clone()),
        );
        agg.drain(10);

        let batch = agg.swap_write_buffer().unwrap();
        let stack = StackPayload::from_json(&batch[0].stack_json).unwrap();
        assert_eq!(stack.frames, frames);
        assert_eq!(stack.exception.as_ref(), Some(&exception));
        assert_eq!(batch[0].payload.as_deref(), Some("{\"hp\":0}"));

        let records = agg.snapshot();
        assert_eq!(records[0].frames, frames);
        assert_eq!(records[0].exception, Some(exception));
    }

    #[test]
    fn test_clear_restarts_ids_and_keeps_buffers() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.ingest(event(LogLevel::Info, "a.rs", 2, "m"));
        agg.drain(10);
        agg.clear();
        assert_eq!(agg.record_count(), 0);
        assert_eq!(agg.pending_commands(), 2);

        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.drain(10);
        let records = agg.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].count, 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let agg = aggregator(DEFAULT_QUEUE_CEILING);
        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.drain(10);
        let before = agg.snapshot();

        agg.ingest(event(LogLevel::Info, "a.rs", 1, "m"));
        agg.drain(10);
        assert_eq!(before[0].count, 1);
        assert_eq!(agg.snapshot()[0].count, 2);
    }
}
