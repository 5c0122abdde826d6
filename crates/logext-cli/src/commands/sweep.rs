//! Sweep command implementation

use anyhow::{bail, Context, Result};
use logext::{list_log_files, sweep};
use std::path::PathBuf;

pub fn execute(dir: PathBuf, keep: usize, dry_run: bool) -> Result<()> {
    if keep == 0 {
        bail!("--keep must be at least 1");
    }

    let files = list_log_files(&dir)
        .with_context(|| format!("Failed to list log directory {}", dir.display()))?;

    if dry_run {
        let doomed: Vec<_> = files.iter().skip(keep).collect();
        println!("Would delete {} of {} file(s):", doomed.len(), files.len());
        for entry in doomed {
            println!("  {}", entry.path.display());
        }
        return Ok(());
    }

    tracing::info!("Sweeping {} (keeping {})", dir.display(), keep);
    let stats = sweep(&dir, keep, None);

    println!("Examined: {}", stats.examined);
    println!("Deleted: {}", stats.deleted);
    if stats.failed > 0 {
        println!("⚠️  Failed to delete: {}", stats.failed);
    }

    Ok(())
}
