// Application state for HTTP handlers
use crate::application::measurement_store::MeasurementStore;
use crate::application::metrics::Metrics;
use crate::application::report_service::ReportService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub store: Arc<dyn MeasurementStore>,
    pub metrics: Arc<Metrics>,
    pub merge_sources: bool,
}
