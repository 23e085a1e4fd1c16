//! Pipeline driver
//!
//! Wires the Client Factory, the Usage Fetcher and the Table Loader into
//! one sequential run.

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{create_cost_explorer_client, Settings};
use crate::db::{LoadOutcome, TableLoader};
use crate::error::PipelineError;
use crate::schemas::UsageQuery;
use crate::services::{CostExplorerService, CostSource, UsageFetcher};

/// What one run did
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub buckets: usize,
    pub records: usize,
    pub load: LoadOutcome,
}

impl PipelineReport {
    /// One-line status for stdout; only claims rows were loaded when they were
    pub fn summary(&self) -> String {
        match &self.load {
            LoadOutcome::Loaded { table, rows } => format!(
                "Loaded {} records from {} time buckets into '{}' (run {}).",
                rows, self.buckets, table, self.run_id
            ),
            LoadOutcome::Failed { table, .. } => format!(
                "Fetched {} records from {} time buckets; nothing was loaded into '{}' (run {}).",
                self.records, self.buckets, table, self.run_id
            ),
        }
    }
}

/// One configured ETL run
pub struct Pipeline<S> {
    settings: Settings,
    query: UsageQuery,
    fetcher: UsageFetcher<S>,
    loader: TableLoader,
}

impl Pipeline<CostExplorerService> {
    /// Create a pipeline against the live Cost Explorer API
    pub async fn new(settings: Settings) -> Result<Self, PipelineError> {
        settings.validate()?;
        let client = create_cost_explorer_client(&settings).await;
        Self::with_source(settings, CostExplorerService::new(client))
    }
}

impl<S: CostSource> Pipeline<S> {
    /// Create a pipeline reading from an arbitrary cost source
    pub fn with_source(settings: Settings, source: S) -> Result<Self, PipelineError> {
        let query = settings.usage_query()?;
        let fetcher = UsageFetcher::new(source, settings.default_currency.clone());
        let loader = TableLoader::new(settings.database_url.clone());

        Ok(Self {
            settings,
            query,
            fetcher,
            loader,
        })
    }

    /// Fetch once, then load.
    ///
    /// A fetch failure aborts the run with an error; a load failure is
    /// reported in `PipelineReport::load`.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", run_id = %run_id);

        async move {
            tracing::info!(
                start = %self.query.start(),
                end = %self.query.end(),
                granularity = %self.query.granularity(),
                table = %self.settings.table_name,
                mode = %self.settings.load_mode,
                "Starting cost and usage load"
            );

            let table = self.fetcher.fetch_usage(&self.query).await?;

            let load = self
                .loader
                .load(&table, &self.settings.table_name, self.settings.load_mode)
                .await;

            Ok::<_, PipelineError>(PipelineReport {
                run_id,
                buckets: table.buckets,
                records: table.len(),
                load,
            })
        }
        .instrument(span)
        .await
    }
}
