//! Table loader
//!
//! Writes a `UsageTable` to a SQL table over a single connection. Postgres
//! and SQLite URLs are both accepted through the `sqlx` `Any` driver.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlx::{Any, AnyConnection, Connection, Transaction};
use std::fmt;
use std::str::FromStr;

use crate::db::models::{is_valid_table_name, UsageRecord, UsageTable, COLUMNS};
use crate::error::{ConfigError, LoadError};

/// Rows per multi-row INSERT statement
const INSERT_BATCH_ROWS: usize = 200;

/// How existing contents of the destination table are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Drop and recreate the table, discarding prior contents
    #[default]
    Replace,
    /// Create the table if missing and add rows to it
    Append,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Replace => write!(f, "replace"),
            LoadMode::Append => write!(f, "append"),
        }
    }
}

impl FromStr for LoadMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(LoadMode::Replace),
            "append" => Ok(LoadMode::Append),
            _ => Err(ConfigError::invalid("LOAD_MODE", s, "expected replace or append")),
        }
    }
}

/// Result of one load attempt
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { table: String, rows: usize },
    Failed { table: String, error: LoadError },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    pub fn table(&self) -> &str {
        match self {
            LoadOutcome::Loaded { table, .. } | LoadOutcome::Failed { table, .. } => table,
        }
    }
}

/// Writes usage tables to the database behind `database_url`
#[derive(Clone)]
pub struct TableLoader {
    database_url: String,
}

impl TableLoader {
    pub fn new(database_url: impl Into<String>) -> Self {
        sqlx::any::install_default_drivers();
        Self {
            database_url: database_url.into(),
        }
    }

    /// Write `table` into `table_name`.
    ///
    /// Never fails: errors are printed with the table name and returned as
    /// `LoadOutcome::Failed` so the caller decides what a failed load means.
    pub async fn load(&self, table: &UsageTable, table_name: &str, mode: LoadMode) -> LoadOutcome {
        match self.try_load(table, table_name, mode).await {
            Ok(rows) => {
                tracing::info!(table = %table_name, rows, mode = %mode, "Usage table loaded");
                println!("Data inserted into table '{}' successfully.", table_name);
                LoadOutcome::Loaded {
                    table: table_name.to_string(),
                    rows,
                }
            }
            Err(error) => {
                tracing::error!(table = %table_name, error = %error, "Usage table load failed");
                println!(
                    "An error occurred while inserting data into table '{}': {}",
                    table_name, error
                );
                LoadOutcome::Failed {
                    table: table_name.to_string(),
                    error,
                }
            }
        }
    }

    async fn try_load(
        &self,
        table: &UsageTable,
        table_name: &str,
        mode: LoadMode,
    ) -> Result<usize, LoadError> {
        if !is_valid_table_name(table_name) {
            return Err(LoadError::InvalidTableName(table_name.to_string()));
        }

        let mut conn = AnyConnection::connect(&self.database_url)
            .await
            .map_err(LoadError::Connection)?;

        let result = write_table(&mut conn, table, table_name, mode).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "Failed to close database connection cleanly");
        }

        result
    }
}

async fn write_table(
    conn: &mut AnyConnection,
    table: &UsageTable,
    table_name: &str,
    mode: LoadMode,
) -> Result<usize, LoadError> {
    let mut tx = conn.begin().await.map_err(LoadError::Transaction)?;

    match mode {
        LoadMode::Replace => {
            sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table_name))
                .execute(&mut *tx)
                .await
                .map_err(LoadError::Schema)?;
            sqlx::query(&create_table_sql(table_name, false))
                .execute(&mut *tx)
                .await
                .map_err(LoadError::Schema)?;
        }
        LoadMode::Append => {
            sqlx::query(&create_table_sql(table_name, true))
                .execute(&mut *tx)
                .await
                .map_err(LoadError::Schema)?;
        }
    }

    let mut rows = 0;
    for batch in table.records.chunks(INSERT_BATCH_ROWS) {
        rows += insert_batch(&mut tx, table_name, batch).await?;
    }

    tx.commit().await.map_err(LoadError::Transaction)?;

    tracing::debug!(table = %table_name, rows, "Committed usage rows");
    Ok(rows)
}

async fn insert_batch(
    tx: &mut Transaction<'_, Any>,
    table_name: &str,
    batch: &[UsageRecord],
) -> Result<usize, LoadError> {
    let sql = insert_sql(table_name, batch.len());
    let mut query = sqlx::query(&sql);
    for record in batch {
        for value in record.column_values() {
            query = query.bind(value);
        }
    }

    query.execute(&mut **tx).await.map_err(LoadError::Insert)?;
    Ok(batch.len())
}

fn create_table_sql(table_name: &str, if_not_exists: bool) -> String {
    let columns = COLUMNS
        .iter()
        .map(|c| {
            if c.nullable {
                format!("\"{}\" TEXT", c.name)
            } else {
                format!("\"{}\" TEXT NOT NULL", c.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE {}\"{}\" ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        table_name,
        columns
    )
}

/// Multi-row INSERT with `$n` placeholders, understood by Postgres and SQLite
fn insert_sql(table_name: &str, rows: usize) -> String {
    let columns = COLUMNS
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let width = COLUMNS.len();
    let values = (0..rows)
        .map(|row| {
            let placeholders = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO \"{}\" ({}) VALUES {}", table_name, columns, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::EMPTY_ANNOTATION;
    use tempfile::TempDir;

    fn record(day: &str, service: &str, cost: &str) -> UsageRecord {
        UsageRecord {
            timestamp: day.to_string(),
            service: Some(service.to_string()),
            resource_type: Some("instance".to_string()),
            region: Some("us-east-1".to_string()),
            usage_type: Some("BoxUsage:t3.micro".to_string()),
            account: Some("123456789012".to_string()),
            cost: cost.to_string(),
            usage_quantity: "24".to_string(),
            tags: EMPTY_ANNOTATION.to_string(),
            savings_plans: EMPTY_ANNOTATION.to_string(),
            currency: "USD".to_string(),
        }
    }

    fn sample_table() -> UsageTable {
        UsageTable {
            records: vec![
                record("2023-01-01", "Amazon EC2", "1.25"),
                record("2023-01-01", "Amazon S3", "0.02"),
                record("2023-01-02", "Amazon EC2", "1.30"),
            ],
            buckets: 2,
        }
    }

    fn sqlite_url(dir: &TempDir) -> String {
        format!("sqlite://{}?mode=rwc", dir.path().join("usage.db").display())
    }

    async fn row_count(url: &str, table_name: &str) -> i64 {
        let mut conn = AnyConnection::connect(url).await.unwrap();
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM \"{}\"", table_name))
            .fetch_one(&mut conn)
            .await
            .unwrap()
    }

    #[test]
    fn test_load_mode_parsing() {
        assert_eq!("replace".parse::<LoadMode>().unwrap(), LoadMode::Replace);
        assert_eq!("APPEND".parse::<LoadMode>().unwrap(), LoadMode::Append);
        assert!("upsert".parse::<LoadMode>().is_err());
        assert_eq!(LoadMode::default(), LoadMode::Replace);
    }

    #[test]
    fn test_insert_sql_numbers_placeholders() {
        let sql = insert_sql("costs", 2);
        assert!(sql.starts_with("INSERT INTO \"costs\" (\"timestamp\", \"service\""));
        assert!(sql.contains("($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"));
        assert!(sql.ends_with("$21, $22)"));
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("costs", true);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"costs\""));
        assert!(sql.contains("\"service\" TEXT,"));
        assert!(sql.contains("\"cost\" TEXT NOT NULL"));
    }

    #[tokio::test]
    async fn test_load_writes_all_rows() {
        let dir = TempDir::new().unwrap();
        let url = sqlite_url(&dir);
        let loader = TableLoader::new(&url);

        let outcome = loader.load(&sample_table(), "cost_usage_data", LoadMode::Replace).await;
        assert!(outcome.is_success());
        assert!(matches!(outcome, LoadOutcome::Loaded { rows: 3, .. }));

        let mut conn = AnyConnection::connect(&url).await.unwrap();
        let rows: Vec<(String, Option<String>, String, String)> = sqlx::query_as(
            "SELECT \"timestamp\", \"service\", \"cost\", \"currency\" FROM \"cost_usage_data\"",
        )
        .fetch_all(&mut conn)
        .await
        .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.contains(&(
            "2023-01-02".to_string(),
            Some("Amazon EC2".to_string()),
            "1.30".to_string(),
            "USD".to_string()
        )));
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let url = sqlite_url(&dir);
        let loader = TableLoader::new(&url);
        let table = sample_table();

        assert!(loader.load(&table, "usage", LoadMode::Replace).await.is_success());
        assert!(loader.load(&table, "usage", LoadMode::Replace).await.is_success());

        assert_eq!(row_count(&url, "usage").await, 3);
    }

    #[tokio::test]
    async fn test_append_adds_rows() {
        let dir = TempDir::new().unwrap();
        let url = sqlite_url(&dir);
        let loader = TableLoader::new(&url);
        let table = sample_table();

        assert!(loader.load(&table, "usage", LoadMode::Append).await.is_success());
        assert!(loader.load(&table, "usage", LoadMode::Append).await.is_success());

        assert_eq!(row_count(&url, "usage").await, 6);
    }

    #[tokio::test]
    async fn test_empty_table_still_creates_destination() {
        let dir = TempDir::new().unwrap();
        let url = sqlite_url(&dir);
        let loader = TableLoader::new(&url);

        let outcome = loader.load(&UsageTable::default(), "empty_usage", LoadMode::Replace).await;
        assert!(matches!(outcome, LoadOutcome::Loaded { rows: 0, .. }));
        assert_eq!(row_count(&url, "empty_usage").await, 0);
    }

    #[tokio::test]
    async fn test_large_table_is_batched() {
        let dir = TempDir::new().unwrap();
        let url = sqlite_url(&dir);
        let loader = TableLoader::new(&url);
        let records = (0..(INSERT_BATCH_ROWS * 2 + 7))
            .map(|i| record("2023-01-01", &format!("service-{}", i), "0.01"))
            .collect();
        let table = UsageTable { records, buckets: 1 };

        let outcome = loader.load(&table, "many_rows", LoadMode::Replace).await;
        assert!(outcome.is_success());
        assert_eq!(row_count(&url, "many_rows").await, (INSERT_BATCH_ROWS * 2 + 7) as i64);
    }

    #[tokio::test]
    async fn test_unreachable_database_reports_failure() {
        let dir = TempDir::new().unwrap();
        // Parent directory does not exist, so SQLite cannot open the file
        let url = format!(
            "sqlite://{}",
            dir.path().join("missing").join("usage.db").display()
        );
        let loader = TableLoader::new(url);

        let outcome = loader.load(&sample_table(), "cost_usage_data", LoadMode::Replace).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.table(), "cost_usage_data");
        assert!(matches!(
            outcome,
            LoadOutcome::Failed {
                error: LoadError::Connection(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_table_name_is_rejected_before_connecting() {
        let loader = TableLoader::new("postgres://nobody@127.0.0.1:1/none");
        let outcome = loader.load(&sample_table(), "bad name", LoadMode::Replace).await;
        assert!(matches!(
            outcome,
            LoadOutcome::Failed {
                error: LoadError::InvalidTableName(_),
                ..
            }
        ));
    }
}
