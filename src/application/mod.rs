// Application layer - Use cases and orchestration
pub mod align;
pub mod digest;
pub mod forecast_service;
pub mod measurement_store;
pub mod metrics;
pub mod panel_strategy;
pub mod report_service;
pub mod window;
