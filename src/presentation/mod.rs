// Presentation layer - HTTP interface
pub mod app_state;
pub mod handlers;
