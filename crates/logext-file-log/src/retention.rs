//! Retention sweep for rotated log files
//!
//! Keeps the newest `keep` `.logext` files of a directory (by creation time,
//! falling back to modification time) and deletes the rest. A file that
//! cannot be deleted is logged and skipped so it never aborts the sweep.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use crate::format::FILE_EXTENSION;

/// A `.logext` file found in the log directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    pub path: PathBuf,
    pub created: SystemTime,
    pub len: u64,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// `.logext` files found
    pub examined: usize,
    pub deleted: usize,
    /// Files that should have been deleted but could not be
    pub failed: usize,
}

/// List `.logext` files in `dir`, newest first
///
/// Ties on timestamp are broken by file name, which embeds the open time.
pub fn list_log_files(dir: &Path) -> io::Result<Vec<LogFileEntry>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let created = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(LogFileEntry {
            path,
            created,
            len: meta.len(),
        });
    }

    files.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| b.path.file_name().cmp(&a.path.file_name()))
    });
    Ok(files)
}

/// Delete all but the newest `keep` files of `dir`
///
/// `keep` is treated as at least 1. `protected` (normally the file the writer
/// currently appends to) is never deleted.
pub fn sweep(dir: &Path, keep: usize, protected: Option<&Path>) -> SweepStats {
    let keep = keep.max(1);
    let files = match list_log_files(dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "retention sweep could not list log directory");
            logext_core::observe::record_write_error("cleanup");
            return SweepStats::default();
        }
    };

    let mut stats = SweepStats {
        examined: files.len(),
        ..Default::default()
    };

    // The protected file always stays and takes one of the `keep` slots
    let protected_present =
        protected.is_some_and(|p| files.iter().any(|f| f.path.as_path() == p));
    let mut slots = if protected_present { keep - 1 } else { keep };

    for file in &files {
        if protected == Some(file.path.as_path()) {
            continue;
        }
        if slots > 0 {
            slots -= 1;
            continue;
        }
        match fs::remove_file(&file.path) {
            Ok(()) => {
                tracing::debug!(path = %file.path.display(), "deleted old log file");
                stats.deleted += 1;
            }
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "failed to delete old log file");
                logext_core::observe::record_write_error("cleanup");
                stats.failed += 1;
            }
        }
    }

    if stats.deleted > 0 {
        tracing::info!(
            dir = %dir.display(),
            deleted = stats.deleted,
            kept = keep,
            "retention sweep finished"
        );
    }
    stats
}

/// Run [`sweep`] on its own thread
///
/// Returns `None` if the thread could not be spawned; the failure is logged.
pub fn spawn_sweep(
    dir: PathBuf,
    keep: usize,
    protected: Option<PathBuf>,
) -> Option<JoinHandle<SweepStats>> {
    let spawned = thread::Builder::new()
        .name("logext-retention".into())
        .spawn(move || sweep(&dir, keep, protected.as_deref()));
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "failed to spawn retention sweep");
            None
        }
    }
}
