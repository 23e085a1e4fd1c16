//! Cost Explorer Loader
//!
//! Fetches AWS Cost Explorer usage for a date range and writes it to a
//! relational table, replacing its previous contents.

use anyhow::Result;
use clap::Parser;
use cost_explorer_loader::{
    config::{parse_date, Settings},
    logging::init_tracing,
    schemas::{parse_list, Granularity},
    LoadMode, LoadOutcome, Pipeline,
};

/// Cost Explorer Loader
///
/// Loads one date range of AWS cost and usage data into a SQL table.
/// Every option falls back to its environment variable.
#[derive(Parser, Debug)]
#[command(name = "cost-explorer-loader")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// AWS region of the Cost Explorer endpoint (overrides AWS_REGION)
    #[arg(long)]
    region: Option<String>,

    /// First day of the range, inclusive (overrides START_DATE)
    #[arg(long)]
    start_date: Option<String>,

    /// Day after the range, exclusive (overrides END_DATE)
    #[arg(long)]
    end_date: Option<String>,

    /// Bucket size (overrides GRANULARITY)
    #[arg(long, value_enum)]
    granularity: Option<Granularity>,

    /// Comma separated metrics, e.g. BlendedCost,UsageQuantity (overrides METRICS)
    #[arg(long)]
    metrics: Option<String>,

    /// Comma separated grouping dimensions (overrides DIMENSIONS)
    #[arg(long)]
    dimensions: Option<String>,

    /// Destination database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Destination table (overrides TABLE_NAME)
    #[arg(short, long)]
    table_name: Option<String>,

    /// Replace the table or append to it (overrides LOAD_MODE)
    #[arg(short, long, value_enum)]
    mode: Option<LoadMode>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::from_env()?;

    // Override settings with CLI arguments
    if let Some(region) = args.region {
        settings.aws_region = region;
    }
    if let Some(start) = args.start_date {
        settings.start_date = parse_date("--start-date", &start)?;
    }
    if let Some(end) = args.end_date {
        settings.end_date = parse_date("--end-date", &end)?;
    }
    if let Some(granularity) = args.granularity {
        settings.granularity = granularity;
    }
    if let Some(metrics) = args.metrics {
        settings.metrics = parse_list(&metrics)?;
    }
    if let Some(dimensions) = args.dimensions {
        settings.dimensions = parse_list(&dimensions)?;
    }
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }
    if let Some(table_name) = args.table_name {
        settings.table_name = table_name;
    }
    if let Some(mode) = args.mode {
        settings.load_mode = mode;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    init_tracing(&settings.log_level, args.log_json);

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        region = %settings.aws_region,
        "Starting cost explorer loader"
    );

    // Validates settings before the client is built
    let pipeline = Pipeline::new(settings).await?;
    let report = pipeline.run().await?;

    println!("{}", report.summary());

    // The loader already printed the details; surface the failure as an exit code
    if let LoadOutcome::Failed { table, error } = report.load {
        anyhow::bail!("loading table '{}' failed: {}", table, error);
    }

    Ok(())
}
