//! Usage fetcher
//!
//! Runs the cost query once and flattens the time-bucketed, group-keyed
//! response into a `UsageTable`: one row per group per bucket, in response
//! order, nothing merged or sorted.

use crate::db::models::{UsageRecord, UsageTable, EMPTY_ANNOTATION};
use crate::error::FetchError;
use crate::schemas::{CostAndUsageResponse, Group, Metric, UsageQuery};
use crate::services::cost_explorer::CostSource;

/// Fetch stage of the pipeline
pub struct UsageFetcher<S> {
    source: S,
    default_currency: String,
}

impl<S: CostSource> UsageFetcher<S> {
    pub fn new(source: S, default_currency: impl Into<String>) -> Self {
        Self {
            source,
            default_currency: default_currency.into(),
        }
    }

    /// Issue exactly one request and flatten its response
    pub async fn fetch_usage(&self, query: &UsageQuery) -> Result<UsageTable, FetchError> {
        let response = self.source.get_cost_and_usage(query).await?;

        if let Some(token) = &response.next_page_token {
            tracing::warn!(
                next_page_token = %token,
                "Cost Explorer result is truncated; only the first page is loaded"
            );
        }

        let table = flatten_response(&response, query, &self.default_currency)?;

        tracing::info!(
            buckets = table.buckets,
            records = table.len(),
            "Fetched cost and usage data"
        );

        Ok(table)
    }
}

/// Flatten a response into rows.
///
/// Key `i` of every group is stored in the column of `query.dimensions()[i]`;
/// a group whose key count differs from the dimension count is rejected
/// rather than mislabeled.
pub fn flatten_response(
    response: &CostAndUsageResponse,
    query: &UsageQuery,
    default_currency: &str,
) -> Result<UsageTable, FetchError> {
    let cost_metric = query.cost_metric();
    let currency = resolve_currency(response, cost_metric, default_currency)?;
    let dimensions = query.dimensions();

    let mut records = Vec::new();
    for (index, bucket) in response.results_by_time.iter().enumerate() {
        let period = bucket
            .time_period
            .as_ref()
            .ok_or(FetchError::MissingTimePeriod { index })?;

        if bucket.estimated {
            tracing::debug!(bucket = %period.start, "Bucket amounts are estimated");
        }

        for group in &bucket.groups {
            if group.keys.len() != dimensions.len() {
                return Err(FetchError::KeyArityMismatch {
                    bucket: period.start.clone(),
                    expected: dimensions.len(),
                    found: group.keys.len(),
                });
            }

            let mut record = UsageRecord {
                timestamp: period.start.clone(),
                cost: metric_amount(group, cost_metric, &period.start)?,
                usage_quantity: metric_amount(group, Metric::UsageQuantity, &period.start)?,
                tags: render_annotation(group.tags.as_ref()),
                savings_plans: render_annotation(group.savings_plans_details.as_ref()),
                currency: currency.clone(),
                ..Default::default()
            };
            for (dimension, key) in dimensions.iter().zip(&group.keys) {
                record.set_dimension(*dimension, key.clone());
            }

            records.push(record);
        }
    }

    Ok(UsageTable {
        records,
        buckets: response.results_by_time.len(),
    })
}

/// Currency shared by every row of the response.
///
/// Taken from the unit of the cost metric; all groups must agree. Buckets
/// without groups fall back to their totals, and a response carrying no
/// unit at all uses `default_currency`.
pub fn resolve_currency(
    response: &CostAndUsageResponse,
    cost_metric: Metric,
    default_currency: &str,
) -> Result<String, FetchError> {
    let mut currency: Option<&str> = None;

    let group_units = response
        .results_by_time
        .iter()
        .flat_map(|bucket| bucket.groups.iter())
        .filter_map(|group| group.metrics.get(cost_metric.as_str()))
        .filter_map(|value| value.unit.as_deref());

    for unit in group_units {
        match currency {
            None => currency = Some(unit),
            Some(expected) if expected != unit => {
                return Err(FetchError::MixedCurrency {
                    expected: expected.to_string(),
                    found: unit.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    if currency.is_none() {
        currency = response
            .results_by_time
            .iter()
            .filter_map(|bucket| bucket.total.get(cost_metric.as_str()))
            .find_map(|value| value.unit.as_deref());
    }

    Ok(currency.unwrap_or(default_currency).to_string())
}

fn metric_amount(group: &Group, metric: Metric, bucket: &str) -> Result<String, FetchError> {
    let value = group
        .metrics
        .get(metric.as_str())
        .ok_or_else(|| FetchError::MissingMetric {
            bucket: bucket.to_string(),
            metric: metric.to_string(),
        })?;

    value.amount.clone().ok_or_else(|| FetchError::MissingAmount {
        bucket: bucket.to_string(),
        metric: metric.to_string(),
    })
}

fn render_annotation(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => EMPTY_ANNOTATION.to_string(),
    }
}
