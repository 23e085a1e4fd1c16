//! Configuration management module
//!
//! This module handles loading and validating the pipeline configuration
//! from environment variables and .env files, and building AWS clients.

pub mod aws;
pub mod settings;

pub use aws::{build_aws_config, create_cost_explorer_client, AwsConfigBuilder};
pub use settings::{parse_date, Settings};
