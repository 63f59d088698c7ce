// Aligned envelope domain model
use chrono::{DateTime, Utc};

/// One aligned row: the primary (inside) value at a primary timestamp and
/// the min/max/mean over every secondary contribution found within the
/// tolerance window. Aggregates are NaN when nothing contributed.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopePoint {
    pub timestamp: DateTime<Utc>,
    pub inside: f64,
    pub outside_min: f64,
    pub outside_max: f64,
    pub outside_mean: f64,
}

/// Output of the timestamp aligner; always exactly one point per primary
/// row, in primary order.
#[derive(Debug, Clone, Default)]
pub struct AlignedEnvelope {
    pub points: Vec<EnvelopePoint>,
}

impl AlignedEnvelope {
    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn inside(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.inside).collect()
    }

    pub fn outside_min(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.outside_min).collect()
    }

    pub fn outside_max(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.outside_max).collect()
    }

    pub fn outside_mean(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.outside_mean).collect()
    }
}
