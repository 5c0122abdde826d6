//! Inspect command implementation

use anyhow::{bail, Context, Result};
use logext::{load_log_file, AggregatedRecord, LogLevel};
use std::path::PathBuf;

use super::format_ticks;

pub struct InspectOptions {
    pub min_level: LogLevel,
    pub limit: Option<usize>,
    pub by_count: bool,
    pub json: bool,
}

pub fn execute(file: PathBuf, options: InspectOptions) -> Result<()> {
    tracing::debug!("Inspecting log file: {}", file.display());

    if !file.is_file() {
        bail!("Log file not found: {}", file.display());
    }

    let log = load_log_file(&file)
        .with_context(|| format!("Failed to read log file {}", file.display()))?;
    let total = log.records.len();

    let mut records: Vec<AggregatedRecord> = log
        .records
        .into_iter()
        .filter(|r| r.level >= options.min_level)
        .collect();
    if options.by_count {
        records.sort_by(|a, b| b.count.cmp(&a.count).then(a.id.cmp(&b.id)));
    }
    if let Some(limit) = options.limit {
        records.truncate(limit);
    }

    if options.json {
        let json = serde_json::to_string_pretty(&records).context("Failed to encode records")?;
        println!("{}", json);
        return Ok(());
    }

    println!("\nLog File");
    println!("{}", "=".repeat(60));
    println!("Path: {}", file.display());
    println!("Version: {}", log.version.as_deref().unwrap_or("-"));
    println!("Session: {}", log.session.as_deref().unwrap_or("-"));
    println!("Records: {} ({} shown)", total, records.len());
    if log.skipped_lines > 0 {
        println!("⚠️  Skipped lines: {}", log.skipped_lines);
    }
    println!();

    for record in &records {
        print_record(record);
    }

    Ok(())
}

fn print_record(record: &AggregatedRecord) {
    println!(
        "#{:<5} {:<8} x{:<6} {}  {}",
        record.id,
        record.level.as_str(),
        record.count,
        format_ticks(record.first_seen),
        record.caller_location()
    );
    for line in record.message.lines() {
        println!("    {}", line);
    }
    if let Some(payload) = &record.payload {
        println!("    payload: {}", payload);
    }
    if let Some(exception) = &record.exception {
        println!("    exception: {}: {}", exception.type_name, exception.message);
        if let Some(inner) = &exception.inner_message {
            println!("    inner: {}", inner);
        }
    }
    for frame in &record.frames {
        let marker = if frame.is_project_code { "*" } else { " " };
        println!(
            "    {} at {}.{} ({}:{})",
            marker, frame.scope, frame.member, frame.file, frame.line
        );
    }
}
