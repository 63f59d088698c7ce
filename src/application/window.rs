// Last-N-hours window derivation
use crate::domain::series::SeriesTable;
use chrono::{DateTime, Duration, Utc};

pub const DAY_HOURS: i64 = 24;

/// Sub-table of rows with timestamp >= reference - hours. Pure; the input
/// table is untouched and the result is a fresh instance.
pub fn last_hours(table: &SeriesTable, reference: DateTime<Utc>, hours: i64) -> SeriesTable {
    let cutoff = reference - Duration::hours(hours);
    // Rows are sorted ascending, so the window is a suffix.
    let start = table.timestamps().partition_point(|t| *t < cutoff);
    table.suffix(start)
}

/// The 24h window used by the "-24h" panel variants.
pub fn last_day(table: &SeriesTable, reference: DateTime<Utc>) -> SeriesTable {
    last_hours(table, reference, DAY_HOURS)
}
