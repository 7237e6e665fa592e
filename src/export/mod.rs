use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::analytics::YearMonth;
use crate::models::Entry;

const HEADER: [&str; 6] = ["Date", "Type", "Category", "Amount", "Remarks", "Id"];

/// Write entries as CSV in snapshot order. Returns the number of rows.
pub(crate) fn write_entries<W: Write>(writer: W, entries: &[Entry]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER).context("Failed to write CSV header")?;
    for entry in entries {
        wtr.write_record([
            entry.date.format("%Y-%m-%d").to_string(),
            entry.kind.to_string(),
            entry.category.clone(),
            entry.amount.to_string(),
            entry.remarks.clone(),
            entry.id.clone(),
        ])
        .with_context(|| format!("Failed to write entry {}", entry.id))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(entries.len())
}

pub(crate) fn export_to_file(path: &Path, entries: &[Entry]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let count = write_entries(file, entries)?;
    tracing::info!(path = %path.display(), count, "exported entries");
    Ok(count)
}

/// `~/budgetwiz-export-<month|all>.csv`
pub(crate) fn default_path(month: Option<YearMonth>) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    let suffix = month.map_or_else(|| "all".to_string(), |m| m.key());
    PathBuf::from(home).join(format!("budgetwiz-export-{suffix}.csv"))
}

pub(crate) fn shellexpand(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}
