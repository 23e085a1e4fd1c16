//! Pipeline error types

use aws_sdk_costexplorer::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_costexplorer::operation::get_cost_and_usage::GetCostAndUsageError;
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::NaiveDate;
use thiserror::Error;

use crate::schemas::Dimension;

/// Invalid or incomplete configuration, raised before any network call
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("At least one grouping dimension is required")]
    NoDimensions,

    #[error("Dimension {0} requested more than once")]
    DuplicateDimension(Dimension),

    #[error("Metrics must include a cost metric (e.g. BlendedCost)")]
    MissingCostMetric,

    #[error("Metrics must include UsageQuantity")]
    MissingUsageMetric,

    #[error("Invalid table name '{0}': expected letters, digits and underscores")]
    InvalidTableName(String),

    #[error("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together")]
    PartialCredentials,
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of the fetch stage. Never swallowed: an empty table always means
/// the service returned no usage.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid Cost Explorer request: {0}")]
    Request(String),

    #[error("Cost Explorer throttled the request: {0}")]
    Throttled(String),

    #[error("Cost Explorer data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Requested billing period has expired: {0}")]
    BillExpired(String),

    #[error("Cost Explorer API error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("Cost Explorer request failed: {0}")]
    Transport(String),

    #[error("Malformed response: ResultsByTime missing")]
    MissingResultsByTime,

    #[error("Malformed response: time bucket {index} has no TimePeriod")]
    MissingTimePeriod { index: usize },

    #[error("Group in bucket {bucket} has {found} keys, expected {expected} (one per dimension)")]
    KeyArityMismatch {
        bucket: String,
        expected: usize,
        found: usize,
    },

    #[error("Group in bucket {bucket} is missing metric {metric}")]
    MissingMetric { bucket: String, metric: String },

    #[error("Metric {metric} in bucket {bucket} has no Amount")]
    MissingAmount { bucket: String, metric: String },

    #[error("Mixed currencies in response: {expected} and {found}")]
    MixedCurrency { expected: String, found: String },
}

impl FetchError {
    /// Classify an SDK error of the `GetCostAndUsage` operation
    pub fn from_sdk_error<R>(err: SdkError<GetCostAndUsageError, R>) -> Self
    where
        R: std::fmt::Debug,
    {
        match &err {
            SdkError::ServiceError(service_err) => {
                let error = service_err.err();
                let message = error.message().unwrap_or("no message").to_string();
                match error {
                    GetCostAndUsageError::LimitExceededException(_) => FetchError::Throttled(message),
                    GetCostAndUsageError::DataUnavailableException(_) => {
                        FetchError::DataUnavailable(message)
                    }
                    GetCostAndUsageError::BillExpirationException(_) => FetchError::BillExpired(message),
                    _ => FetchError::Api {
                        code: error.code().unwrap_or("Unknown").to_string(),
                        message,
                    },
                }
            }
            _ => FetchError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

/// Failure of the load stage, reported through `LoadOutcome::Failed`
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("Database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Could not prepare table: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Insert failed: {0}")]
    Insert(#[source] sqlx::Error),

    #[error("Transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),
}

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FetchError::KeyArityMismatch {
            bucket: "2023-01-01".to_string(),
            expected: 3,
            found: 5,
        };
        assert_eq!(
            err.to_string(),
            "Group in bucket 2023-01-01 has 5 keys, expected 3 (one per dimension)"
        );

        let err = ConfigError::invalid("GRANULARITY", "WEEKLY", "expected DAILY, MONTHLY or HOURLY");
        assert!(err.to_string().contains("WEEKLY"));
    }

    #[test]
    fn test_pipeline_error_from_fetch() {
        let err: PipelineError = FetchError::MissingResultsByTime.into();
        assert!(matches!(err, PipelineError::Fetch(_)));
        assert!(err.to_string().starts_with("Fetch failed"));
    }

    #[test]
    fn test_load_error_messages() {
        let err = LoadError::InvalidTableName("bad name".to_string());
        assert_eq!(err.to_string(), "Invalid table name 'bad name'");

        let err = LoadError::Connection(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().starts_with("Database connection failed: "));

        let err = LoadError::Insert(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Insert failed: "));
    }
}
