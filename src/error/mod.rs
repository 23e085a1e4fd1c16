//! Error types for each pipeline stage

pub mod types;

pub use types::{ConfigError, FetchError, LoadError, PipelineError};
