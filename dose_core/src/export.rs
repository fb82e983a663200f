//! CSV export of schedule entries.

use crate::numeric::format_dose;
use crate::{Result, ScheduleEntry};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    weekday: String,
    dose: String,
    instruction: String,
    tablets: u32,
}

impl From<&ScheduleEntry> for CsvRow {
    fn from(entry: &ScheduleEntry) -> Self {
        CsvRow {
            date: entry.date.format("%Y-%m-%d").to_string(),
            weekday: entry.weekday.to_string(),
            dose: format_dose(entry.dose),
            instruction: entry.combination.to_string(),
            tablets: entry.combination.physical_tablets(),
        }
    }
}

/// Write `entries` to `path` with a header row, replacing any existing file.
///
/// Returns the number of rows written.
pub fn write_schedule_csv(path: &Path, entries: &[ScheduleEntry]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        writer.serialize(CsvRow::from(entry))?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} schedule rows to {:?}", entries.len(), path);
    Ok(entries.len())
}
