//! Application settings and configuration
//!
//! This module provides configuration management for the loader, reading
//! settings from environment variables (and `.env`) with sensible defaults.

use chrono::NaiveDate;
use serde::Serialize;
use std::env;

use crate::db::models::is_valid_table_name;
use crate::db::LoadMode;
use crate::error::ConfigError;
use crate::schemas::{parse_list, Dimension, Granularity, Metric, UsageQuery};

const DEFAULT_START_DATE: &str = "2023-01-01";
const DEFAULT_END_DATE: &str = "2023-01-31";
const DEFAULT_METRICS: &str = "BlendedCost,UsageQuantity";
const DEFAULT_DIMENSIONS: &str = "SERVICE,RESOURCE_TYPE,REGION,USAGE_TYPE,LINKED_ACCOUNT";

/// Everything one pipeline run needs
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub log_level: String,

    // AWS settings
    pub aws_region: String,
    #[serde(skip_serializing)]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub aws_secret_access_key: Option<String>,
    pub cost_explorer_endpoint_url: Option<String>,

    // Query
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,

    /// Used when no cost metric in the response carries a unit
    pub default_currency: String,

    // Destination (the URL may embed a password)
    #[serde(skip_serializing)]
    pub database_url: String,
    pub table_name: String,
    pub load_mode: LoadMode,
}

impl Settings {
    /// Read settings from the environment without validating them, so
    /// command-line overrides can be applied first
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Self {
            app_name: env_or_default("APP_NAME", "cost-explorer-loader"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            aws_region: env_or_default("AWS_REGION", "us-east-1"),
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            cost_explorer_endpoint_url: env::var("COST_EXPLORER_ENDPOINT_URL").ok(),

            start_date: parse_date("START_DATE", &env_or_default("START_DATE", DEFAULT_START_DATE))?,
            end_date: parse_date("END_DATE", &env_or_default("END_DATE", DEFAULT_END_DATE))?,
            granularity: env_or_default("GRANULARITY", "DAILY").parse()?,
            metrics: parse_list(&env_or_default("METRICS", DEFAULT_METRICS))?,
            dimensions: parse_list(&env_or_default("DIMENSIONS", DEFAULT_DIMENSIONS))?,
            default_currency: env_or_default("DEFAULT_CURRENCY", "USD"),

            database_url: env::var("DATABASE_URL")
                .or_else(|_| env::var("POSTGRES_URL"))
                .unwrap_or_default(),
            table_name: env_or_default("TABLE_NAME", "cost_usage_data"),
            load_mode: env_or_default("LOAD_MODE", "replace").parse()?,
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        if !is_valid_table_name(&self.table_name) {
            return Err(ConfigError::InvalidTableName(self.table_name.clone()));
        }

        if self.aws_access_key_id.is_some() != self.aws_secret_access_key.is_some() {
            return Err(ConfigError::PartialCredentials);
        }

        // Date range, dimensions and metrics
        self.usage_query()?;

        Ok(())
    }

    /// Build the Cost Explorer query described by these settings
    pub fn usage_query(&self) -> Result<UsageQuery, ConfigError> {
        UsageQuery::new(
            self.start_date,
            self.end_date,
            self.granularity,
            self.metrics.clone(),
            self.dimensions.clone(),
        )
    }

    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "cost-explorer-loader".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            cost_explorer_endpoint_url: None,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2023, 1, 31).unwrap_or_default(),
            granularity: Granularity::Daily,
            metrics: vec![Metric::BlendedCost, Metric::UsageQuantity],
            dimensions: Dimension::all(),
            default_currency: "USD".to_string(),
            database_url: String::new(),
            table_name: "cost_usage_data".to_string(),
            load_mode: LoadMode::Replace,
        }
    }
}

/// Parse an ISO `YYYY-MM-DD` date
pub fn parse_date(key: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
