//! Stats command implementation

use anyhow::{Context, Result};
use logext::{list_log_files, load_log_file, LogLevel};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::format_size;

pub fn execute(dir: PathBuf) -> Result<()> {
    tracing::debug!("Summarizing log directory: {}", dir.display());

    let files = list_log_files(&dir)
        .with_context(|| format!("Failed to list log directory {}", dir.display()))?;

    println!("\nLog Directory");
    println!("{}", "=".repeat(60));
    println!("Path: {}", dir.display());
    println!("Files: {}", files.len());

    if files.is_empty() {
        println!("\nNo log files found");
        return Ok(());
    }

    let mut levels: BTreeMap<LogLevel, u64> = BTreeMap::new();
    let mut total_bytes = 0u64;
    let mut total_records = 0usize;
    let mut total_events = 0u64;

    println!(
        "\n{:<40} {:>10} {:>8} {:>10} {:>8}",
        "File", "Size", "Records", "Events", "Skipped"
    );
    for entry in &files {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let log = match load_log_file(&entry.path) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", entry.path.display(), e);
                continue;
            }
        };

        let events: u64 = log.records.iter().map(|r| r.count).sum();
        for record in &log.records {
            *levels.entry(record.level).or_default() += record.count;
        }

        println!(
            "{:<40} {:>10} {:>8} {:>10} {:>8}",
            name,
            format_size(entry.len),
            log.records.len(),
            events,
            log.skipped_lines
        );

        total_bytes += entry.len;
        total_records += log.records.len();
        total_events += events;
    }

    println!("\nTotals:");
    println!("  Size: {}", format_size(total_bytes));
    println!("  Records: {}", total_records);
    println!("  Events: {}", total_events);

    println!("\nEvents by level:");
    for (level, count) in levels {
        println!("  {:<8} {}", level.as_str(), count);
    }

    Ok(())
}
