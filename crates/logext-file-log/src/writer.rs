//! Background writer persisting command batches to rotating `.logext` files
//!
//! The writer owns one dedicated thread. Every `flush_interval` (or earlier,
//! when notified) it swaps the aggregator's filled write buffer out,
//! serializes each command into a line, returns the command to the pool and
//! appends the lines to the current file. When the file grows past the
//! configured size it is closed and a new one is opened.
//!
//! Lifecycle: `Idle → Running → Stopping → Stopped`. Nothing on the write
//! path panics or returns an error across the thread boundary; failures are
//! reported through a throttled `tracing` channel and the batch is dropped.

use chrono::Local;
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use logext_core::traits::CommandBatch;
use logext_core::{
    observe, CommandPool, LoggerSettings, LogextError, PipelineConfig, Result, WriteBufferSource,
};
use parking_lot::{Condvar, Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::diagnostics::ErrorThrottle;
use crate::format::{self, encode_command, write_header};
use crate::retention;

/// Upper bound on name-collision retries when opening a file
const MAX_OPEN_ATTEMPTS: u32 = 1000;

/// Configuration for [`LogFileWriter`]
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Directory receiving `.logext` files (created if missing)
    pub log_dir: PathBuf,

    /// Rotation size, retention count and file prefix
    pub settings: LoggerSettings,

    /// Wake-up interval of the writer thread (default: 500ms)
    pub flush_interval: Duration,

    /// Bound on how long `stop` waits for the thread (default: 1s)
    pub shutdown_timeout: Duration,

    /// Capacity of the buffered file writer
    pub write_buffer_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for WriterConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            log_dir: config.log_dir.clone(),
            settings: config.settings.clone(),
            flush_interval: config.flush_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            write_buffer_capacity: config.write_buffer_capacity,
        }
    }
}

/// Lifecycle state of the writer
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl WriterState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WriterState::Idle,
            1 => WriterState::Running,
            2 => WriterState::Stopping,
            _ => WriterState::Stopped,
        }
    }
}

/// Counters for the writer
#[derive(Debug, Default)]
struct WriterMetrics {
    batches: AtomicU64,
    lines: AtomicU64,
    bytes: AtomicU64,
    rotations: AtomicU64,
    write_errors: AtomicU64,
}

/// Point-in-time writer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub batches: u64,
    pub lines: u64,
    pub bytes: u64,
    pub rotations: u64,
    pub write_errors: u64,
}

/// The file currently appended to
struct ActiveFile {
    path: PathBuf,
    file: BufWriter<File>,
}

/// State guarded by the sink lock: the open file and a reusable line buffer
struct Sink {
    active: Option<ActiveFile>,
    line: String,
}

/// State shared between the handle and the worker thread
struct Shared {
    log_dir: PathBuf,
    settings: RwLock<LoggerSettings>,
    write_buffer_capacity: usize,
    source: Arc<dyn WriteBufferSource>,
    pool: Arc<CommandPool>,
    sink: Mutex<Sink>,
    state: AtomicU8,
    wake: Mutex<bool>,
    wake_cv: Condvar,
    metrics: WriterMetrics,
    errors: ErrorThrottle,
}

struct Worker {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

/// Handle to the background log writer
pub struct LogFileWriter {
    shared: Arc<Shared>,
    flush_interval: Duration,
    shutdown_timeout: Duration,
    worker: Mutex<Option<Worker>>,
}

impl LogFileWriter {
    /// Create a writer in the `Idle` state
    pub fn new(
        config: WriterConfig,
        source: Arc<dyn WriteBufferSource>,
        pool: Arc<CommandPool>,
    ) -> Self {
        let shared = Shared {
            log_dir: config.log_dir,
            settings: RwLock::new(config.settings),
            write_buffer_capacity: config.write_buffer_capacity.max(1),
            source,
            pool,
            sink: Mutex::new(Sink {
                active: None,
                line: String::with_capacity(512),
            }),
            state: AtomicU8::new(WriterState::Idle as u8),
            wake: Mutex::new(false),
            wake_cv: Condvar::new(),
            metrics: WriterMetrics::default(),
            errors: ErrorThrottle::default(),
        };

        Self {
            shared: Arc::new(shared),
            flush_interval: config.flush_interval,
            shutdown_timeout: config.shutdown_timeout,
            worker: Mutex::new(None),
        }
    }

    /// Open the first file and spawn the writer thread
    ///
    /// Fails if the writer was already started, or if the log directory or
    /// first file cannot be created.
    pub fn start(&self) -> Result<()> {
        // Held until the worker is stored so a concurrent `stop` waits for it
        let mut worker_slot = self.worker.lock();

        self.shared
            .state
            .compare_exchange(
                WriterState::Idle as u8,
                WriterState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|s| {
                LogextError::InvalidState(format!(
                    "writer cannot start from {:?}",
                    WriterState::from_u8(s)
                ))
            })?;

        let first = match self.shared.open_new_file() {
            Ok(active) => active,
            Err(e) => {
                self.shared.abort_start();
                return Err(e.into());
            }
        };
        let first_path = first.path.clone();
        self.shared.sink.lock().active = Some(first);

        let (done_tx, done_rx) = channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let interval = self.flush_interval;
        let spawned = thread::Builder::new()
            .name("logext-writer".into())
            .spawn(move || {
                shared.run(interval);
                let _ = done_tx.send(());
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.sink.lock().active = None;
                self.shared.abort_start();
                return Err(e.into());
            }
        };
        *worker_slot = Some(Worker {
            handle,
            done: done_rx,
        });
        drop(worker_slot);

        tracing::info!(
            dir = %self.shared.log_dir.display(),
            file = %first_path.display(),
            "log writer started"
        );

        let keep = self.shared.settings.read().max_history_files;
        retention::spawn_sweep(self.shared.log_dir.clone(), keep, Some(first_path));
        Ok(())
    }

    /// Wake the writer thread before its next timeout
    pub fn notify(&self) {
        self.shared.signal();
    }

    /// Run one swap-and-write pass on the calling thread
    ///
    /// Returns the number of commands taken from the source. Does nothing
    /// unless the writer is running.
    pub fn flush(&self) -> usize {
        if self.state() != WriterState::Running {
            return 0;
        }
        let mut sink = self.shared.sink.lock();
        self.shared.write_pass(&mut sink)
    }

    /// Stop the writer thread and release the file
    ///
    /// Idempotent. Waits at most `shutdown_timeout` for the thread, then runs
    /// one final swap-and-write pass and closes the file. A thread that does
    /// not exit in time is detached.
    pub fn stop(&self) {
        loop {
            let (from, to) = match self.shared.state() {
                WriterState::Running => (WriterState::Running, WriterState::Stopping),
                WriterState::Idle => (WriterState::Idle, WriterState::Stopped),
                WriterState::Stopping | WriterState::Stopped => return,
            };
            if self.shared.transition(from, to) {
                if from == WriterState::Idle {
                    return;
                }
                break;
            }
        }

        self.shared.signal();

        if let Some(worker) = self.worker.lock().take() {
            match worker.done.recv_timeout(self.shutdown_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        tracing::error!("log writer thread panicked");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        timeout_ms = self.shutdown_timeout.as_millis() as u64,
                        "log writer thread did not exit in time, detaching"
                    );
                }
            }
        }

        match self.shared.sink.try_lock_for(self.shutdown_timeout) {
            Some(mut sink) => {
                let written = self.shared.write_pass(&mut sink);
                if let Some(mut active) = sink.active.take() {
                    if let Err(e) = active.file.flush() {
                        self.shared.report_error("flush", &e);
                    }
                }
                tracing::info!(final_commands = written, "log writer stopped");
            }
            None => {
                tracing::warn!("log file still busy at shutdown, skipping final flush");
            }
        }

        self.shared.set_state(WriterState::Stopped);
    }

    /// Apply new runtime settings
    ///
    /// The size threshold is used at the next size check and the prefix at
    /// the next rotation. A changed history count starts a background
    /// retention sweep.
    pub fn apply_settings(&self, settings: LoggerSettings) -> Result<()> {
        settings.validate()?;
        let history_changed = {
            let mut current = self.shared.settings.write();
            let changed = current.max_history_files != settings.max_history_files;
            *current = settings;
            changed
        };

        if history_changed {
            let keep = self.shared.settings.read().max_history_files;
            retention::spawn_sweep(self.shared.log_dir.clone(), keep, self.current_file());
        }
        Ok(())
    }

    pub fn settings(&self) -> LoggerSettings {
        self.shared.settings.read().clone()
    }

    pub fn state(&self) -> WriterState {
        self.shared.state()
    }

    pub fn log_dir(&self) -> &Path {
        &self.shared.log_dir
    }

    /// Path of the file currently appended to
    pub fn current_file(&self) -> Option<PathBuf> {
        self.shared
            .sink
            .lock()
            .active
            .as_ref()
            .map(|a| a.path.clone())
    }

    pub fn stats(&self) -> WriterStats {
        let m = &self.shared.metrics;
        WriterStats {
            batches: m.batches.load(Ordering::Relaxed),
            lines: m.lines.load(Ordering::Relaxed),
            bytes: m.bytes.load(Ordering::Relaxed),
            rotations: m.rotations.load(Ordering::Relaxed),
            write_errors: m.write_errors.load(Ordering::Relaxed),
        }
    }
}

impl Drop for LogFileWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn state(&self) -> WriterState {
        WriterState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: WriterState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: WriterState, to: WriterState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Undo a failed `start`, unless a concurrent `stop` already moved on
    fn abort_start(&self) {
        self.transition(WriterState::Running, WriterState::Idle);
    }

    fn signal(&self) {
        let mut woken = self.wake.lock();
        *woken = true;
        self.wake_cv.notify_one();
    }

    /// Block until signaled or `timeout` elapses
    fn wait(&self, timeout: Duration) {
        let mut woken = self.wake.lock();
        if !*woken {
            self.wake_cv.wait_for(&mut woken, timeout);
        }
        *woken = false;
    }

    fn run(&self, interval: Duration) {
        while self.state() == WriterState::Running {
            self.wait(interval);
            if self.state() != WriterState::Running {
                break;
            }
            let mut sink = self.sink.lock();
            self.write_pass(&mut sink);
        }
        tracing::debug!("log writer thread exiting");
    }

    /// Swap the pending batch out and append it to the current file
    fn write_pass(&self, sink: &mut Sink) -> usize {
        let Some(mut batch) = self.source.swap_write_buffer() else {
            return 0;
        };
        let count = batch.len();

        if sink.active.is_none() && self.state() == WriterState::Running {
            match self.open_new_file() {
                Ok(active) => sink.active = Some(active),
                Err(e) => self.report_error("open", &e),
            }
        }

        let Sink { active, line } = sink;
        let (lines, bytes) = self.write_batch(active.as_mut(), line, &mut batch);
        self.source.recycle_write_buffer(batch);

        let Some(file) = active.as_mut() else {
            return count;
        };

        self.metrics.batches.fetch_add(1, Ordering::Relaxed);
        self.metrics.lines.fetch_add(lines, Ordering::Relaxed);
        self.metrics.bytes.fetch_add(bytes, Ordering::Relaxed);
        observe::record_write_batch(lines, bytes);

        if let Err(e) = file.file.flush() {
            self.report_error("flush", &e);
            return count;
        }

        let max_bytes = self.settings.read().max_file_bytes();
        match file.file.get_ref().metadata() {
            Ok(meta) if meta.len() > max_bytes => self.rotate(active),
            Ok(_) => {}
            Err(e) => self.report_error("stat", &e),
        }
        count
    }

    /// Serialize and append every command, returning each to the pool
    ///
    /// After the first failed write the rest of the batch is still
    /// serialized and recycled but no longer written.
    fn write_batch(
        &self,
        mut file: Option<&mut ActiveFile>,
        line: &mut String,
        batch: &mut CommandBatch,
    ) -> (u64, u64) {
        let mut lines = 0u64;
        let mut bytes = 0u64;
        let mut failed = file.is_none();

        for cmd in batch.drain(..) {
            line.clear();
            encode_command(line, &cmd);
            self.pool.put(cmd);

            if failed {
                continue;
            }
            if let Some(active) = file.as_deref_mut() {
                match active.file.write_all(line.as_bytes()) {
                    Ok(()) => {
                        lines += 1;
                        bytes += line.len() as u64;
                    }
                    Err(e) => {
                        self.report_error("write", &e);
                        failed = true;
                    }
                }
            }
        }
        (lines, bytes)
    }

    /// Close the current file and open a fresh one
    fn rotate(&self, active: &mut Option<ActiveFile>) {
        let old = active.take();
        let old_path = old.as_ref().map(|a| a.path.clone());
        drop(old);

        match self.open_new_file() {
            Ok(next) => {
                tracing::info!(
                    from = ?old_path,
                    to = %next.path.display(),
                    "rotated log file"
                );
                let keep = self.settings.read().max_history_files;
                retention::spawn_sweep(self.log_dir.clone(), keep, Some(next.path.clone()));
                *active = Some(next);
                self.metrics.rotations.fetch_add(1, Ordering::Relaxed);
                observe::record_rotation();
            }
            Err(e) => self.report_error("rotate", &e),
        }
    }

    /// Create a new file named after the current prefix and time, header included
    fn open_new_file(&self) -> io::Result<ActiveFile> {
        fs::create_dir_all(&self.log_dir)?;
        let prefix = self.settings.read().file_prefix.clone();
        let now = Local::now();

        for attempt in 0..MAX_OPEN_ATTEMPTS {
            let path = self.log_dir.join(format::file_name(&prefix, now, attempt));
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            let mut file = BufWriter::with_capacity(self.write_buffer_capacity, file);
            let mut header = String::with_capacity(64);
            write_header(&mut header, now);
            file.write_all(header.as_bytes())?;
            file.flush()?;
            return Ok(ActiveFile { path, file });
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for prefix {}", prefix),
        ))
    }

    fn report_error(&self, op: &'static str, error: &io::Error) {
        self.metrics.write_errors.fetch_add(1, Ordering::Relaxed);
        observe::record_write_error(op);
        self.errors.error(op, error);
    }
}
