// Store trait for measurement data access
use crate::domain::series::SeriesTable;
use crate::domain::source::SourceDescriptor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// All rows of the source's table as a sorted series table.
    async fn read_series(
        &self,
        source: &'static SourceDescriptor,
        is_primary: bool,
    ) -> anyhow::Result<SeriesTable>;

    /// Append one indoor sensor reading.
    async fn insert_measurement(
        &self,
        timestamp: DateTime<Utc>,
        humidity: f64,
        room_temp: f64,
        cpu_temp: f64,
    ) -> anyhow::Result<()>;

    /// Stored forecast temperature at an exact timestamp, if any.
    async fn forecast_temp_at(&self, timestamp: DateTime<Utc>) -> anyhow::Result<Option<f64>>;

    /// Insert a new forecast row.
    async fn insert_forecast(
        &self,
        timestamp: DateTime<Utc>,
        temp: f64,
        temp_dev: f64,
    ) -> anyhow::Result<()>;

    /// Overwrite the forecast stored at a timestamp.
    async fn update_forecast(
        &self,
        timestamp: DateTime<Utc>,
        temp: f64,
        temp_dev: f64,
    ) -> anyhow::Result<()>;
}
