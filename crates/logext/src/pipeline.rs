//! `LogPipeline`: aggregator, command pool and file writer wired together

use logext_core::{
    AggregatedRecord, CommandPool, LogEvent, LogLevel, LoggerSettings, PipelineConfig,
    PoolStatsSnapshot, Result,
};
use logext_file_log::{LogFileWriter, WriterConfig, WriterStats};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crate::aggregator::{Aggregator, AggregatorStats};

/// A running log pipeline
///
/// `log` may be called from any thread. `tick` should be called from one
/// thread on a fixed cadence (e.g. once per frame); the writer persists
/// drained records on its own thread.
pub struct LogPipeline {
    config: PipelineConfig,
    pool: Arc<CommandPool>,
    aggregator: Arc<Aggregator>,
    writer: LogFileWriter,
    min_level: AtomicU8,
    closed: AtomicBool,
}

impl LogPipeline {
    /// Validate `config`, open the first log file and start the writer
    pub fn open(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let pool = Arc::new(CommandPool::new());
        let aggregator = Arc::new(Aggregator::new(pool.clone(), config.queue_ceiling));
        let writer = LogFileWriter::new(
            WriterConfig::from(&config),
            aggregator.clone(),
            pool.clone(),
        );
        writer.start()?;

        tracing::info!(
            dir = %config.log_dir.display(),
            queue_ceiling = config.queue_ceiling,
            "log pipeline opened"
        );

        Ok(Self {
            min_level: AtomicU8::new(config.settings.min_log_level.as_u8()),
            config,
            pool,
            aggregator,
            writer,
            closed: AtomicBool::new(false),
        })
    }

    /// Open a pipeline writing into `log_dir` with default options
    pub fn open_dir(log_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(PipelineConfig::new(log_dir))
    }

    /// Submit an event
    ///
    /// Returns `false` when the event is below the minimum level, dropped by
    /// backpressure, or the pipeline is shut down.
    pub fn log(&self, event: LogEvent) -> bool {
        if event.level == LogLevel::None || event.level.as_u8() < self.min_level() {
            return false;
        }
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.aggregator.ingest(event)
    }

    /// Drain one batch of queued events into records
    pub fn tick(&self) -> usize {
        self.aggregator.drain(self.config.drain_batch_limit)
    }

    /// Drain everything queued so far and write it out on the calling thread
    ///
    /// Returns the number of events drained.
    pub fn flush(&self) -> usize {
        let drained = self.drain_pending();
        self.writer.flush();
        drained
    }

    /// Drain the events queued at the time of the call
    ///
    /// Bounded by the current depth so busy producers cannot keep it looping.
    fn drain_pending(&self) -> usize {
        let mut remaining = self.aggregator.queue_depth();
        let mut drained = 0;
        while remaining > 0 {
            let n = self.aggregator.drain(self.config.drain_batch_limit.min(remaining));
            if n == 0 {
                break;
            }
            drained += n;
            remaining = remaining.saturating_sub(n);
        }
        drained
    }

    pub fn snapshot(&self) -> Vec<AggregatedRecord> {
        self.aggregator.snapshot()
    }

    /// Forget all records; ids restart at 1
    pub fn clear(&self) {
        self.aggregator.clear();
    }

    /// Apply new runtime settings
    pub fn update_settings(&self, settings: LoggerSettings) -> Result<()> {
        let min_level = settings.min_log_level;
        self.writer.apply_settings(settings)?;
        self.min_level.store(min_level.as_u8(), Ordering::Release);
        tracing::debug!(min_level = %min_level, "logger settings updated");
        Ok(())
    }

    pub fn settings(&self) -> LoggerSettings {
        self.writer.settings()
    }

    fn min_level(&self) -> u8 {
        self.min_level.load(Ordering::Acquire)
    }

    pub fn log_dir(&self) -> &Path {
        self.writer.log_dir()
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.writer.current_file()
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn aggregator_stats(&self) -> AggregatorStats {
        self.aggregator.stats()
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn pool_stats(&self) -> PoolStatsSnapshot {
        self.pool.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drain what is queued, stop the writer and close the file
    ///
    /// Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let drained = self.drain_pending();
        self.writer.stop();
        tracing::info!(
            final_events = drained,
            records = self.aggregator.record_count(),
            "log pipeline shut down"
        );
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
