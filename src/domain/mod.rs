// Domain layer - Core business entities
pub mod envelope;
pub mod panel;
pub mod series;
pub mod source;
