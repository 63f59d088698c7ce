// Report service - Use case for composing summary reports
use crate::application::digest::build_digest;
use crate::application::measurement_store::MeasurementStore;
use crate::application::metrics::Metrics;
use crate::application::panel_strategy::build_panel;
use crate::domain::panel::{Measure, PanelMode, PanelPlan};
use crate::domain::series::SeriesTable;
use crate::domain::source::{ROOM, SECONDARY_SOURCES};
use crate::infrastructure::chart;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

const GRID_ROWS: usize = 2;
const GRID_COLS: usize = 2;
const REPORT_EXTENSION: &str = "svg";

/// Misconfiguration of a report request. Data sparsity is never an error;
/// these fire only when the caller wired the sources or grid wrong.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no source table is flagged primary")]
    MissingPrimary,
    #[error("{count} source tables are flagged primary, expected exactly one")]
    MultiplePrimaries { count: usize },
    #[error("a {rows}x{cols} grid cannot hold {panels} panels")]
    GridMismatch {
        rows: usize,
        cols: usize,
        panels: usize,
    },
}

/// Outcome of a persisting build: the figure itself plus where it was
/// written, when the configured path qualified.
#[derive(Debug)]
pub struct BuiltReport {
    pub svg: String,
    pub persisted_to: Option<PathBuf>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn MeasurementStore>,
    metrics: Arc<Metrics>,
    tolerance_minutes: f64,
    output_path: PathBuf,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        metrics: Arc<Metrics>,
        tolerance_minutes: f64,
        output_path: PathBuf,
    ) -> Self {
        Self {
            store,
            metrics,
            tolerance_minutes,
            output_path,
        }
    }

    /// Compose the four-panel summary figure and return it as an SVG
    /// document. Counts the outcome in the process metrics.
    pub async fn build_report(&self, merge_sources: bool) -> anyhow::Result<String> {
        match self.compose(merge_sources).await {
            Ok(svg) => {
                self.metrics.report_generated();
                Ok(svg)
            }
            Err(err) => {
                self.metrics.report_failed();
                Err(err)
            }
        }
    }

    /// Build the report and write it to the configured output path. The
    /// write is skipped (with a log line, not an error) when the path does
    /// not carry the report extension; the figure is returned either way.
    pub async fn build_and_persist(&self, merge_sources: bool) -> anyhow::Result<BuiltReport> {
        let svg = self.build_report(merge_sources).await?;

        let path = self.output_path.as_path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(REPORT_EXTENSION) {
            tracing::warn!(
                path = %path.display(),
                "output path does not end in .{}, skipping persistence",
                REPORT_EXTENSION
            );
            return Ok(BuiltReport {
                svg,
                persisted_to: None,
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating report directory {}", parent.display()))?;
            }
        }
        tokio::fs::write(path, &svg)
            .await
            .with_context(|| format!("writing report to {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = svg.len(), "summary report written");
        Ok(BuiltReport {
            svg,
            persisted_to: Some(path.to_path_buf()),
        })
    }

    /// Plain-text statistics digest over the same tables the report uses.
    pub async fn digest(&self) -> anyhow::Result<String> {
        let tables = self.gather_tables().await?;
        Ok(build_digest(&tables, Utc::now()))
    }

    async fn compose(&self, merge_sources: bool) -> anyhow::Result<String> {
        let tables = self.gather_tables().await?;
        let plans = build_panels(&tables, merge_sources, Utc::now(), self.tolerance_minutes)?;
        check_grid(plans.len())?;
        chart::render_report(&plans, GRID_ROWS, GRID_COLS)?
            .context("chart composer produced no figure")
    }

    /// Read a fresh snapshot of every registered source. A failing
    /// secondary read degrades to an empty table; a failing primary read
    /// aborts the report.
    async fn gather_tables(&self) -> anyhow::Result<Vec<SeriesTable>> {
        let mut tables = Vec::with_capacity(1 + SECONDARY_SOURCES.len());
        tables.push(
            self.store
                .read_series(&ROOM, true)
                .await
                .context("reading sensor table")?,
        );

        for source in SECONDARY_SOURCES {
            match self.store.read_series(source, false).await {
                Ok(table) => tables.push(table),
                Err(err) => {
                    tracing::warn!(source = source.id, error = %err, "source read failed, continuing without it");
                    tables.push(SeriesTable::empty(source, false));
                }
            }
        }
        Ok(tables)
    }
}

/// Build the four panel plans in grid order: temperature all-time,
/// temperature last day, humidity all-time, humidity last day. Temperature
/// panels merge into an envelope only when requested and at least one
/// secondary source is present; humidity always draws distinct overlays.
pub fn build_panels(
    tables: &[SeriesTable],
    merge_sources: bool,
    reference: DateTime<Utc>,
    tolerance_minutes: f64,
) -> Result<Vec<PanelPlan>, ReportError> {
    let primaries: Vec<&SeriesTable> = tables.iter().filter(|t| t.is_primary).collect();
    let primary = match primaries.as_slice() {
        [] => return Err(ReportError::MissingPrimary),
        [single] => *single,
        many => {
            return Err(ReportError::MultiplePrimaries { count: many.len() });
        }
    };
    let secondaries: Vec<SeriesTable> = tables
        .iter()
        .filter(|t| !t.is_primary)
        .cloned()
        .collect();

    let merged = merge_sources && !secondaries.is_empty();
    let (temp_all, temp_day) = if merged {
        (PanelMode::Merged, PanelMode::MergedDay)
    } else {
        (PanelMode::Distinct, PanelMode::DistinctDay)
    };

    let specs = [
        (Measure::Temperature, temp_all),
        (Measure::Temperature, temp_day),
        (Measure::Humidity, PanelMode::Distinct),
        (Measure::Humidity, PanelMode::DistinctDay),
    ];
    Ok(specs
        .into_iter()
        .map(|(measure, mode)| {
            build_panel(
                measure,
                mode,
                primary,
                &secondaries,
                reference,
                tolerance_minutes,
            )
        })
        .collect())
}

fn check_grid(panels: usize) -> Result<(), ReportError> {
    if panels != GRID_ROWS * GRID_COLS {
        return Err(ReportError::GridMismatch {
            rows: GRID_ROWS,
            cols: GRID_COLS,
            panels,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::align::DEFAULT_TOLERANCE_MINUTES;
    use crate::domain::panel::RenderMode;
    use crate::domain::source::DWD;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
    }

    fn room_table() -> SeriesTable {
        SeriesTable::from_rows(
            &ROOM,
            true,
            vec![
                (at(10, 0), vec![21.0, 52.0, 45.0]),
                (at(11, 0), vec![21.5, 51.0, 46.0]),
            ],
        )
    }

    fn dwd_table() -> SeriesTable {
        SeriesTable::from_rows(&DWD, false, vec![(at(10, 2), vec![9.0, 1.0])])
    }

    #[test]
    fn test_missing_primary_is_rejected() {
        let err = build_panels(
            &[dwd_table()],
            false,
            at(12, 0),
            DEFAULT_TOLERANCE_MINUTES,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::MissingPrimary));
    }

    #[test]
    fn test_multiple_primaries_are_rejected() {
        let err = build_panels(
            &[room_table(), room_table()],
            false,
            at(12, 0),
            DEFAULT_TOLERANCE_MINUTES,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::MultiplePrimaries { count: 2 }));
    }

    #[test]
    fn test_single_primary_builds_four_panels() {
        let plans = build_panels(
            &[room_table(), dwd_table()],
            false,
            at(12, 0),
            DEFAULT_TOLERANCE_MINUTES,
        )
        .unwrap();
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[0].title, "Temperature Over Time");
        assert_eq!(plans[1].title, "Temperature Last 24 Hours");
        assert_eq!(plans[2].title, "Humidity Over Time");
        assert_eq!(plans[3].title, "Humidity Last 24 Hours");
        assert!(plans.iter().all(|p| p.mode == RenderMode::Distinct));
    }

    #[test]
    fn test_merge_applies_to_temperature_panels_only() {
        let plans = build_panels(
            &[room_table(), dwd_table()],
            true,
            at(12, 0),
            DEFAULT_TOLERANCE_MINUTES,
        )
        .unwrap();
        assert_eq!(plans[0].mode, RenderMode::Merged);
        assert_eq!(plans[1].mode, RenderMode::Merged);
        assert_eq!(plans[2].mode, RenderMode::Distinct);
        assert_eq!(plans[3].mode, RenderMode::Distinct);
    }

    #[test]
    fn test_merge_without_secondaries_falls_back_to_distinct() {
        let plans = build_panels(
            &[room_table()],
            true,
            at(12, 0),
            DEFAULT_TOLERANCE_MINUTES,
        )
        .unwrap();
        assert!(plans.iter().all(|p| p.mode == RenderMode::Distinct));
    }

    #[test]
    fn test_panels_are_deterministic() {
        let tables = vec![room_table(), dwd_table()];
        let reference = at(12, 0);
        let first = build_panels(&tables, false, reference, DEFAULT_TOLERANCE_MINUTES).unwrap();
        let second = build_panels(&tables, false, reference, DEFAULT_TOLERANCE_MINUTES).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grid_capacity_check() {
        assert!(check_grid(4).is_ok());
        let err = check_grid(3).unwrap_err();
        assert!(matches!(
            err,
            ReportError::GridMismatch {
                rows: 2,
                cols: 2,
                panels: 3
            }
        ));
    }

    struct FlakyStore;

    #[async_trait]
    impl MeasurementStore for FlakyStore {
        async fn read_series(
            &self,
            source: &'static crate::domain::source::SourceDescriptor,
            is_primary: bool,
        ) -> anyhow::Result<SeriesTable> {
            if is_primary {
                Ok(room_table())
            } else if source.id == DWD.id {
                Ok(dwd_table())
            } else {
                anyhow::bail!("table gone")
            }
        }

        async fn insert_measurement(
            &self,
            _timestamp: DateTime<Utc>,
            _humidity: f64,
            _room_temp: f64,
            _cpu_temp: f64,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn forecast_temp_at(&self, _timestamp: DateTime<Utc>) -> anyhow::Result<Option<f64>> {
            Ok(None)
        }

        async fn insert_forecast(
            &self,
            _timestamp: DateTime<Utc>,
            _temp: f64,
            _temp_dev: f64,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn update_forecast(
            &self,
            _timestamp: DateTime<Utc>,
            _temp: f64,
            _temp_dev: f64,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_secondary_reads_degrade_to_empty_tables() {
        let service = ReportService::new(
            Arc::new(FlakyStore),
            Arc::new(Metrics::new()),
            DEFAULT_TOLERANCE_MINUTES,
            PathBuf::from("unused.svg"),
        );
        let tables = service.gather_tables().await.unwrap();
        assert_eq!(tables.len(), 1 + SECONDARY_SOURCES.len());
        assert!(tables[0].is_primary);
        // The DWD read succeeded, the others degraded to empty tables.
        assert!(!tables[1].is_empty());
        assert!(tables[2].is_empty());
        assert!(tables[3].is_empty());
        assert!(tables[4].is_empty());
    }

    #[tokio::test]
    async fn test_report_svg_contains_panel_titles() {
        let service = ReportService::new(
            Arc::new(FlakyStore),
            Arc::new(Metrics::new()),
            DEFAULT_TOLERANCE_MINUTES,
            PathBuf::from("unused.svg"),
        );
        let svg = service.build_report(true).await.unwrap();
        assert!(svg.contains("<svg"));
        // The 24h panels are blank here (the fixture rows are far in the
        // past), so only the all-time captions are guaranteed.
        assert!(svg.contains("Temperature Over Time"));
        assert!(svg.contains("Humidity Over Time"));
    }

    #[tokio::test]
    async fn test_persist_skips_unexpected_extension() {
        let service = ReportService::new(
            Arc::new(FlakyStore),
            Arc::new(Metrics::new()),
            DEFAULT_TOLERANCE_MINUTES,
            PathBuf::from("report.png"),
        );
        let report = service.build_and_persist(false).await.unwrap();
        // The figure comes back even though nothing was written.
        assert!(report.persisted_to.is_none());
        assert!(report.svg.contains("<svg"));
    }
}
