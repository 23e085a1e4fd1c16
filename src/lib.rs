//! AWS Cost Explorer usage loader library

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod schemas;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use db::{LoadMode, LoadOutcome, UsageRecord, UsageTable};
pub use error::{ConfigError, FetchError, LoadError, PipelineError};
pub use pipeline::{Pipeline, PipelineReport};
