//! Cost Explorer response model
//!
//! Mirrors the JSON shape of a `GetCostAndUsage` response so the flattener
//! can run against SDK output and plain JSON fixtures alike.

use aws_sdk_costexplorer::operation::get_cost_and_usage::GetCostAndUsageOutput;
use aws_sdk_costexplorer::types;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FetchError;

/// Response of one `GetCostAndUsage` call
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostAndUsageResponse {
    pub results_by_time: Vec<ResultByTime>,

    /// Present when the service truncated the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// One time bucket of the response
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    #[serde(default)]
    pub time_period: Option<DateInterval>,

    /// Ungrouped totals; only filled by the service when no grouping applies
    #[serde(default)]
    pub total: HashMap<String, MetricValue>,

    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub estimated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateInterval {
    pub start: String,
    pub end: String,
}

/// One dimension-key tuple inside a time bucket
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub metrics: HashMap<String, MetricValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<serde_json::Value>,

    #[serde(
        rename = "SavingsPlansPurchaseRecommendationDetails",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub savings_plans_details: Option<serde_json::Value>,
}

/// Amount and unit of one metric, both as sent by the service
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    #[serde(default)]
    pub amount: Option<String>,

    #[serde(default)]
    pub unit: Option<String>,
}

impl TryFrom<GetCostAndUsageOutput> for CostAndUsageResponse {
    type Error = FetchError;

    fn try_from(output: GetCostAndUsageOutput) -> Result<Self, Self::Error> {
        let results_by_time = output
            .results_by_time
            .ok_or(FetchError::MissingResultsByTime)?
            .into_iter()
            .map(ResultByTime::from)
            .collect();

        Ok(Self {
            results_by_time,
            next_page_token: output.next_page_token,
        })
    }
}

impl From<types::ResultByTime> for ResultByTime {
    fn from(result: types::ResultByTime) -> Self {
        Self {
            time_period: result.time_period.map(|period| DateInterval {
                start: period.start,
                end: period.end,
            }),
            total: convert_metrics(result.total),
            groups: result
                .groups
                .unwrap_or_default()
                .into_iter()
                .map(Group::from)
                .collect(),
            estimated: result.estimated,
        }
    }
}

impl From<types::Group> for Group {
    fn from(group: types::Group) -> Self {
        // The SDK group carries no annotation fields
        Self {
            keys: group.keys.unwrap_or_default(),
            metrics: convert_metrics(group.metrics),
            tags: None,
            savings_plans_details: None,
        }
    }
}

fn convert_metrics(metrics: Option<HashMap<String, types::MetricValue>>) -> HashMap<String, MetricValue> {
    metrics
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            (
                name,
                MetricValue {
                    amount: value.amount,
                    unit: value.unit,
                },
            )
        })
        .collect()
}
