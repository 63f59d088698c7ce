// Nearest-within-tolerance timestamp alignment
use crate::domain::envelope::{AlignedEnvelope, EnvelopePoint};
use crate::domain::series::SeriesTable;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_TOLERANCE_MINUTES: f64 = 5.5;

/// As-of join of every secondary table onto the primary's timestamps.
///
/// For each primary timestamp the single nearest row of each secondary is
/// located; rows farther away than the tolerance contribute nothing. All
/// declared value columns of a contributing row are folded into one
/// min/max/mean aggregate per primary row. Rows with zero contributions
/// keep NaN aggregates, never zero. Ties in distance resolve to the
/// earlier secondary timestamp.
pub fn align(
    primary: &SeriesTable,
    secondaries: &[SeriesTable],
    tolerance_minutes: f64,
) -> AlignedEnvelope {
    if primary.is_empty() {
        return AlignedEnvelope::empty();
    }

    let tolerance = tolerance(tolerance_minutes);
    let inside = primary
        .primary_value_column()
        .and_then(|column| primary.column(column.column));

    let joinable: Vec<&SeriesTable> = secondaries
        .iter()
        .filter(|table| {
            if table.is_primary {
                tracing::debug!(source = table.source.id, "skipping primary-flagged table in secondaries");
                return false;
            }
            !table.is_empty()
        })
        .collect();

    let mut points = Vec::with_capacity(primary.len());
    for (row, t) in primary.timestamps().iter().copied().enumerate() {
        let mut fold = Fold::new();
        for table in &joinable {
            let Some((nearest, distance)) = nearest_row(table.timestamps(), t) else {
                continue;
            };
            if distance > tolerance {
                continue;
            }
            for value_column in table.source.value_columns {
                if let Some(values) = table.column(value_column.column) {
                    fold.add(values[nearest]);
                }
            }
        }
        let (outside_min, outside_max, outside_mean) = fold.finish();
        points.push(EnvelopePoint {
            timestamp: t,
            inside: inside.map_or(f64::NAN, |values| values[row]),
            outside_min,
            outside_max,
            outside_mean,
        });
    }

    AlignedEnvelope { points }
}

fn tolerance(minutes: f64) -> Duration {
    // Fractional minutes survive as milliseconds (5.5 min = 330_000 ms).
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Index of the row closest to `t` and its absolute distance. On equal
/// distance the earlier row wins.
fn nearest_row(timestamps: &[DateTime<Utc>], t: DateTime<Utc>) -> Option<(usize, Duration)> {
    if timestamps.is_empty() {
        return None;
    }
    let split = timestamps.partition_point(|x| *x < t);
    let before = split.checked_sub(1).map(|i| (i, t - timestamps[i]));
    let after = (split < timestamps.len()).then(|| (split, timestamps[split] - t));
    match (before, after) {
        (Some((bi, bd)), Some((_, ad))) if bd <= ad => Some((bi, bd)),
        (_, Some(found)) => Some(found),
        (found, None) => found,
    }
}

/// NaN-safe running min/max/mean.
struct Fold {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Fold {
    fn new() -> Self {
        Self {
            min: f64::NAN,
            max: f64::NAN,
            sum: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.count == 0 || value < self.min {
            self.min = value;
        }
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.count += 1;
    }

    fn finish(self) -> (f64, f64, f64) {
        if self.count == 0 {
            (f64::NAN, f64::NAN, f64::NAN)
        } else {
            (self.min, self.max, self.sum / self.count as f64)
        }
    }
}
