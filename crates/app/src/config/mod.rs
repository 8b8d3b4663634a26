//! Application configuration

pub mod db;
pub mod observability;
pub mod pipeline;

pub use db::DatabaseConfig;
pub use observability::{LogFormat, LoggingConfig};
pub use pipeline::PipelineConfig;
