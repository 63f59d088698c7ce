// Forecast service - Use case for collecting official forecast data
use crate::application::measurement_store::MeasurementStore;
use crate::application::metrics::Metrics;
use crate::infrastructure::dwd_client::{DwdClient, DwdForecast, SANITY_THRESHOLD_DEGREES};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct ForecastService {
    store: Arc<dyn MeasurementStore>,
    client: DwdClient,
    metrics: Arc<Metrics>,
}

impl ForecastService {
    pub fn new(store: Arc<dyn MeasurementStore>, client: DwdClient, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            client,
            metrics,
        }
    }

    /// Fetch the station forecast once and reconcile it with the stored
    /// rows: insert the current hour if new, and when the feed revised an
    /// already-stored value, walk the forecast window backwards and bring
    /// earlier hours up to date as well.
    pub async fn collect_once(&self) -> anyhow::Result<()> {
        let started = Instant::now();
        let forecast = match self.client.fetch().await {
            Ok(forecast) => {
                self.metrics.forecast_fetched(started.elapsed());
                forecast
            }
            Err(err) => {
                self.metrics.forecast_fetch_failed();
                return Err(err);
            }
        };
        self.apply(&forecast, Utc::now()).await
    }

    async fn apply(&self, forecast: &DwdForecast, now: DateTime<Utc>) -> anyhow::Result<()> {
        let hour = now.duration_trunc(Duration::hours(1))?;
        let Some((temp, dev)) = forecast.value_at(hour) else {
            tracing::warn!(at = %hour, "no usable forecast value for the current hour");
            return Ok(());
        };
        tracing::info!(at = %hour, temp, dev, "station forecast");

        match self.store.forecast_temp_at(hour).await? {
            None => {
                self.store.insert_forecast(hour, temp, dev).await?;
            }
            Some(old) if changed(old, temp) => {
                tracing::info!(at = %hour, old, new = temp, "forecast revision detected");
                self.store.update_forecast(hour, temp, dev).await?;
                self.revise_history(forecast, hour).await?;
            }
            Some(_) => {
                tracing::debug!(at = %hour, "stored forecast already current");
            }
        }
        Ok(())
    }

    // Walks hour by hour towards the start of the forecast window,
    // upserting every revised value. Stops at the first placeholder
    // temperature since everything before it is stale feed padding.
    async fn revise_history(
        &self,
        forecast: &DwdForecast,
        current_hour: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut at = current_hour - forecast.time_step();
        while let Some((temp, dev)) = forecast.sample_at(at) {
            if temp.abs() > SANITY_THRESHOLD_DEGREES {
                tracing::warn!(at = %at, temp, "revision stopped at placeholder value");
                break;
            }
            match self.store.forecast_temp_at(at).await? {
                None => {
                    self.store.insert_forecast(at, temp, dev).await?;
                }
                Some(old) if changed(old, temp) => {
                    tracing::info!(at = %at, old, new = temp, "revising stored forecast");
                    self.store.update_forecast(at, temp, dev).await?;
                }
                Some(_) => {}
            }
            at -= forecast.time_step();
        }
        Ok(())
    }
}

fn changed(old: f64, new: f64) -> bool {
    (old - new).abs() > f64::EPSILON
}
