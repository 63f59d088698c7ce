// DWD station overview client
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const STATION_OVERVIEW_URL: &str = "https://app-prod-ws.warnwetter.de/v30/stationOverviewExtended";

// Decoded temperatures outside this range are placeholder values; the
// feed publishes 32767 for hours it has no estimate for.
pub const SANITY_THRESHOLD_DEGREES: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct StationEntry {
    forecast1: ForecastPayload,
}

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    start: i64,
    #[serde(rename = "timeStep")]
    time_step: i64,
    temperature: Vec<f64>,
    #[serde(rename = "temperatureStd")]
    temperature_std: Vec<f64>,
}

/// Decoded hourly forecast window for one station.
///
/// Temperatures arrive in tenths of a degree; the deviation series marks
/// placeholder samples with zero.
#[derive(Debug, Clone)]
pub struct DwdForecast {
    start: DateTime<Utc>,
    time_step: Duration,
    temperature: Vec<f64>,
    temperature_std: Vec<f64>,
}

impl DwdForecast {
    pub fn new(
        start: DateTime<Utc>,
        time_step: Duration,
        temperature: Vec<f64>,
        temperature_std: Vec<f64>,
    ) -> Result<Self> {
        if temperature.len() != temperature_std.len() {
            anyhow::bail!(
                "temperature and deviation series differ in length: {} vs {}",
                temperature.len(),
                temperature_std.len()
            );
        }
        if time_step <= Duration::zero() {
            anyhow::bail!("non-positive forecast time step");
        }
        Ok(Self {
            start,
            time_step,
            temperature,
            temperature_std,
        })
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    fn index_of(&self, at: DateTime<Utc>) -> Option<usize> {
        let offset = at.signed_duration_since(self.start);
        if offset < Duration::zero() {
            return None;
        }
        let index = (offset.num_milliseconds() / self.time_step.num_milliseconds()) as usize;
        (index < self.temperature.len()).then_some(index)
    }

    /// Decoded temperature and deviation at `at`, or None outside the
    /// forecast window.
    pub fn sample_at(&self, at: DateTime<Utc>) -> Option<(f64, f64)> {
        let index = self.index_of(at)?;
        Some((self.temperature[index] / 10.0, self.temperature_std[index]))
    }

    /// Like `sample_at`, but rejects placeholder samples: zero deviation
    /// or a temperature outside the sanity range.
    pub fn value_at(&self, at: DateTime<Utc>) -> Option<(f64, f64)> {
        let (temp, dev) = self.sample_at(at)?;
        if dev == 0.0 {
            tracing::debug!(at = %at, temp, "zero deviation sample rejected");
            return None;
        }
        if temp.abs() > SANITY_THRESHOLD_DEGREES {
            tracing::debug!(at = %at, temp, "out-of-range sample rejected");
            return None;
        }
        Some((temp, dev))
    }
}

/// Client for the public DWD app endpoint. One client serves one station.
#[derive(Debug, Clone)]
pub struct DwdClient {
    station: String,
}

impl DwdClient {
    pub fn new(station: String) -> Self {
        Self { station }
    }

    pub async fn fetch(&self) -> Result<DwdForecast> {
        let client = reqwest::Client::new();
        let response = client
            .get(STATION_OVERVIEW_URL)
            .query(&[("stationIds", self.station.as_str())])
            .send()
            .await
            .context("Failed to send request to DWD")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("DWD request failed with status {}: {}", status, body);
        }

        let mut stations = response
            .json::<HashMap<String, StationEntry>>()
            .await
            .context("Failed to parse DWD response")?;

        let entry = stations
            .remove(&self.station)
            .with_context(|| format!("station {} missing from DWD response", self.station))?;
        decode_forecast(entry.forecast1)
    }
}

fn decode_forecast(payload: ForecastPayload) -> Result<DwdForecast> {
    let start = DateTime::from_timestamp_millis(payload.start)
        .context("forecast start timestamp out of range")?;
    DwdForecast::new(
        start,
        Duration::milliseconds(payload.time_step),
        payload.temperature,
        payload.temperature_std,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn forecast() -> DwdForecast {
        DwdForecast::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            Duration::hours(1),
            vec![105.0, 110.0, 32767.0],
            vec![2.0, 1.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_decode_station_overview_payload() {
        let raw = r#"{
            "10838": {
                "forecast1": {
                    "start": 1710028800000,
                    "timeStep": 3600000,
                    "temperature": [105, 110],
                    "temperatureStd": [2, 1],
                    "humidity": [640, 650]
                }
            }
        }"#;
        let mut stations: HashMap<String, StationEntry> = serde_json::from_str(raw).unwrap();
        let entry = stations.remove("10838").unwrap();
        let forecast = decode_forecast(entry.forecast1).unwrap();

        let start = Utc.timestamp_millis_opt(1710028800000).unwrap();
        assert_eq!(forecast.time_step(), Duration::hours(1));
        assert_eq!(forecast.sample_at(start), Some((10.5, 2.0)));
        assert_eq!(
            forecast.sample_at(start + Duration::hours(1)),
            Some((11.0, 1.0))
        );
    }

    #[test]
    fn test_samples_decode_tenths_of_a_degree() {
        let f = forecast();
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(f.sample_at(start), Some((10.5, 2.0)));
        assert_eq!(f.sample_at(start + Duration::hours(2)), Some((3276.7, 0.0)));
    }

    #[test]
    fn test_out_of_window_is_none() {
        let f = forecast();
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(f.sample_at(start - Duration::hours(1)), None);
        assert_eq!(f.sample_at(start + Duration::hours(3)), None);
    }

    #[test]
    fn test_zero_deviation_rejected_by_value_at() {
        let f = forecast();
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(f.value_at(start + Duration::hours(2)), None);
        assert_eq!(f.value_at(start + Duration::hours(1)), Some((11.0, 1.0)));
    }

    #[test]
    fn test_placeholder_temperature_rejected_by_value_at() {
        let f = DwdForecast::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            Duration::hours(1),
            vec![32767.0],
            vec![5.0],
        )
        .unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        // The raw sample is still visible, the validated value is not.
        assert_eq!(f.sample_at(start), Some((3276.7, 5.0)));
        assert_eq!(f.value_at(start), None);
    }

    #[test]
    fn test_mismatched_series_rejected() {
        let result = DwdForecast::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            Duration::hours(1),
            vec![105.0],
            vec![2.0, 1.0],
        );
        assert!(result.is_err());
    }
}
