// Infrastructure layer - External dependencies and adapters
pub mod chart;
pub mod config;
pub mod dwd_client;
pub mod pg_store;
