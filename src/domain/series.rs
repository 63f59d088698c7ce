// Time-series table domain model
use crate::domain::source::{SourceDescriptor, ValueColumn};
use chrono::{DateTime, Utc};

/// Columnar table of timestamped observations for one source.
///
/// Rows are sorted ascending by timestamp at construction and the table is
/// never mutated afterwards; windowed copies are new instances. Every
/// column vector has exactly as many entries as there are timestamps, with
/// NaN standing in for absent values.
#[derive(Debug, Clone)]
pub struct SeriesTable {
    pub source: &'static SourceDescriptor,
    pub is_primary: bool,
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<(&'static str, Vec<f64>)>,
}

impl SeriesTable {
    /// Build a table from rows. Each row's values align positionally with
    /// `source.column_names()`; short rows are padded with NaN.
    pub fn from_rows(
        source: &'static SourceDescriptor,
        is_primary: bool,
        rows: Vec<(DateTime<Utc>, Vec<f64>)>,
    ) -> Self {
        let names = source.column_names();
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut columns: Vec<(&'static str, Vec<f64>)> = names
            .iter()
            .map(|name| (*name, Vec::with_capacity(rows.len())))
            .collect();

        for (timestamp, values) in rows {
            timestamps.push(timestamp);
            for (idx, (_, column)) in columns.iter_mut().enumerate() {
                column.push(values.get(idx).copied().unwrap_or(f64::NAN));
            }
        }

        let mut table = Self {
            source,
            is_primary,
            timestamps,
            columns,
        };
        table.sort_by_timestamp();
        table
    }

    pub fn empty(source: &'static SourceDescriptor, is_primary: bool) -> Self {
        Self::from_rows(source, is_primary, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, values)| values.as_slice())
    }

    /// All stored columns in declared order.
    pub fn columns(&self) -> impl Iterator<Item = (&'static str, &[f64])> {
        self.columns
            .iter()
            .map(|(name, values)| (*name, values.as_slice()))
    }

    /// The baseline comparison column when this table is primary.
    pub fn primary_value_column(&self) -> Option<&'static ValueColumn> {
        self.source.value_columns.first()
    }

    /// Timestamp/value pairs for one column, in row order.
    pub fn points(&self, name: &str) -> Vec<(DateTime<Utc>, f64)> {
        match self.column(name) {
            Some(values) => self
                .timestamps
                .iter()
                .copied()
                .zip(values.iter().copied())
                .collect(),
            None => Vec::new(),
        }
    }

    /// New table holding the rows from `start` to the end.
    pub fn suffix(&self, start: usize) -> Self {
        let start = start.min(self.timestamps.len());
        Self {
            source: self.source,
            is_primary: self.is_primary,
            timestamps: self.timestamps[start..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (*name, values[start..].to_vec()))
                .collect(),
        }
    }

    // Stable sort applied as one permutation across the timestamps and
    // every column, so rows stay intact.
    fn sort_by_timestamp(&mut self) {
        if self.timestamps.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }
        let mut order: Vec<usize> = (0..self.timestamps.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        for (_, values) in &mut self.columns {
            *values = order.iter().map(|&i| values[i]).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{ROOM, WETTER_COM};
    use chrono::TimeZone;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, minute, 0).unwrap()
    }

    #[test]
    fn test_rows_sorted_ascending() {
        let table = SeriesTable::from_rows(
            &ROOM,
            true,
            vec![
                (ts(20), vec![22.1, 49.0]),
                (ts(0), vec![22.0, 51.0]),
                (ts(10), vec![21.8, 50.0]),
            ],
        );
        assert_eq!(table.timestamps(), &[ts(0), ts(10), ts(20)]);
        assert_eq!(table.column("room_temp").unwrap(), &[22.0, 21.8, 22.1]);
        assert_eq!(table.column("humidity").unwrap(), &[51.0, 50.0, 49.0]);
    }

    #[test]
    fn test_short_rows_pad_with_nan() {
        let table = SeriesTable::from_rows(&ROOM, true, vec![(ts(0), vec![21.5])]);
        assert_eq!(table.column("room_temp").unwrap(), &[21.5]);
        assert!(table.column("humidity").unwrap()[0].is_nan());
    }

    #[test]
    fn test_suffix_is_new_table() {
        let table = SeriesTable::from_rows(
            &WETTER_COM,
            false,
            vec![
                (ts(0), vec![15.0, 14.0]),
                (ts(10), vec![15.5, 14.5]),
                (ts(20), vec![16.0, 15.0]),
            ],
        );
        let tail = table.suffix(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.column("temp_stat").unwrap(), &[15.5, 16.0]);
        assert_eq!(table.len(), 3);

        assert!(table.suffix(9).is_empty());
    }

    #[test]
    fn test_unknown_column_is_none() {
        let table = SeriesTable::empty(&ROOM, true);
        assert!(table.column("wind").is_none());
        assert!(table.points("wind").is_empty());
    }
}
