pub mod inspect;
pub mod stats;
pub mod sweep;

use chrono::Local;
use logext::ticks_to_datetime;

/// Render ticks as local wall-clock time
pub fn format_ticks(ticks: i64) -> String {
    ticks_to_datetime(ticks)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
