//! Cost Explorer query types
//!
//! Granularity, metric and dimension vocabularies plus the validated
//! `UsageQuery` that the fetch stage turns into a `GetCostAndUsage` call.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Time bucket size of a cost query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    #[default]
    Daily,
    Monthly,
    Hourly,
}

impl Granularity {
    /// Wire name expected by Cost Explorer
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Hourly => "HOURLY",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(Granularity::Daily),
            "MONTHLY" => Ok(Granularity::Monthly),
            "HOURLY" => Ok(Granularity::Hourly),
            _ => Err(ConfigError::invalid(
                "GRANULARITY",
                s,
                "expected DAILY, MONTHLY or HOURLY",
            )),
        }
    }
}

/// Metric names accepted by `GetCostAndUsage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Metric {
    BlendedCost,
    UnblendedCost,
    AmortizedCost,
    NetAmortizedCost,
    NetUnblendedCost,
    UsageQuantity,
    NormalizedUsageAmount,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::BlendedCost => "BlendedCost",
            Metric::UnblendedCost => "UnblendedCost",
            Metric::AmortizedCost => "AmortizedCost",
            Metric::NetAmortizedCost => "NetAmortizedCost",
            Metric::NetUnblendedCost => "NetUnblendedCost",
            Metric::UsageQuantity => "UsageQuantity",
            Metric::NormalizedUsageAmount => "NormalizedUsageAmount",
        }
    }

    /// Whether the metric is a monetary amount (as opposed to a usage quantity)
    pub fn is_cost(&self) -> bool {
        !matches!(self, Metric::UsageQuantity | Metric::NormalizedUsageAmount)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Cost Explorer itself is case-insensitive about metric names
        match s.trim().to_lowercase().as_str() {
            "blendedcost" => Ok(Metric::BlendedCost),
            "unblendedcost" => Ok(Metric::UnblendedCost),
            "amortizedcost" => Ok(Metric::AmortizedCost),
            "netamortizedcost" => Ok(Metric::NetAmortizedCost),
            "netunblendedcost" => Ok(Metric::NetUnblendedCost),
            "usagequantity" => Ok(Metric::UsageQuantity),
            "normalizedusageamount" => Ok(Metric::NormalizedUsageAmount),
            _ => Err(ConfigError::invalid("METRICS", s, "unknown metric")),
        }
    }
}

/// Grouping dimensions the loader knows how to store.
///
/// Each dimension owns exactly one column of the destination table, so the
/// association between a group key and a column follows the dimension name
/// and never its position in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Service,
    ResourceType,
    Region,
    UsageType,
    LinkedAccount,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Service => "SERVICE",
            Dimension::ResourceType => "RESOURCE_TYPE",
            Dimension::Region => "REGION",
            Dimension::UsageType => "USAGE_TYPE",
            Dimension::LinkedAccount => "LINKED_ACCOUNT",
        }
    }

    /// The default grouping used when none is configured
    pub fn all() -> Vec<Dimension> {
        vec![
            Dimension::Service,
            Dimension::ResourceType,
            Dimension::Region,
            Dimension::UsageType,
            Dimension::LinkedAccount,
        ]
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SERVICE" => Ok(Dimension::Service),
            "RESOURCE_TYPE" => Ok(Dimension::ResourceType),
            "REGION" => Ok(Dimension::Region),
            "USAGE_TYPE" => Ok(Dimension::UsageType),
            "LINKED_ACCOUNT" => Ok(Dimension::LinkedAccount),
            _ => Err(ConfigError::invalid(
                "DIMENSIONS",
                s,
                "expected one of SERVICE, RESOURCE_TYPE, REGION, USAGE_TYPE, LINKED_ACCOUNT",
            )),
        }
    }
}

/// One `GroupBy` entry of the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupBy {
    #[serde(rename = "Type")]
    pub group_type: &'static str,
    pub key: &'static str,
}

/// Validated `GetCostAndUsage` query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageQuery {
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
    metrics: Vec<Metric>,
    dimensions: Vec<Dimension>,
    cost_metric: Metric,
}

impl UsageQuery {
    /// Build a query, rejecting shapes the flattener cannot map.
    ///
    /// The period is `[start, end)`; `start == end` is accepted here and left
    /// for the service to judge.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
        metrics: Vec<Metric>,
        dimensions: Vec<Dimension>,
    ) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }

        if dimensions.is_empty() {
            return Err(ConfigError::NoDimensions);
        }
        for (i, dim) in dimensions.iter().enumerate() {
            if dimensions[..i].contains(dim) {
                return Err(ConfigError::DuplicateDimension(*dim));
            }
        }

        let cost_metric = metrics
            .iter()
            .copied()
            .find(Metric::is_cost)
            .ok_or(ConfigError::MissingCostMetric)?;
        if !metrics.contains(&Metric::UsageQuantity) {
            return Err(ConfigError::MissingUsageMetric);
        }

        Ok(Self {
            start,
            end,
            granularity,
            metrics,
            dimensions,
            cost_metric,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// First monetary metric of the request; it fills the `cost` column
    pub fn cost_metric(&self) -> Metric {
        self.cost_metric
    }

    /// Start and end of the time period as Cost Explorer expects them.
    ///
    /// Hourly queries require full timestamps, the others plain dates.
    pub fn time_period(&self) -> (String, String) {
        let format = match self.granularity {
            Granularity::Hourly => "%Y-%m-%dT00:00:00Z",
            Granularity::Daily | Granularity::Monthly => "%Y-%m-%d",
        };
        (
            self.start.format(format).to_string(),
            self.end.format(format).to_string(),
        )
    }

    /// Grouping clause, one `DIMENSION` entry per requested dimension in order
    pub fn group_by(&self) -> Vec<GroupBy> {
        self.dimensions
            .iter()
            .map(|dim| GroupBy {
                group_type: "DIMENSION",
                key: dim.as_str(),
            })
            .collect()
    }
}

/// Parse a comma separated list such as `BlendedCost,UsageQuantity`
pub fn parse_list<T>(raw: &str) -> Result<Vec<T>, ConfigError>
where
    T: FromStr<Err = ConfigError>,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse::<T>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn query(dimensions: Vec<Dimension>) -> Result<UsageQuery, ConfigError> {
        UsageQuery::new(
            date("2023-01-01"),
            date("2023-01-31"),
            Granularity::Daily,
            vec![Metric::BlendedCost, Metric::UsageQuantity],
            dimensions,
        )
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!("DAILY".parse::<Granularity>().unwrap(), Granularity::Daily);
        assert_eq!("monthly".parse::<Granularity>().unwrap(), Granularity::Monthly);
        assert_eq!(" Hourly ".parse::<Granularity>().unwrap(), Granularity::Hourly);
        assert!("weekly".parse::<Granularity>().is_err());
        assert_eq!(Granularity::default(), Granularity::Daily);
    }

    #[test]
    fn test_metric_parsing() {
        let metrics: Vec<Metric> = parse_list("BlendedCost, usagequantity").unwrap();
        assert_eq!(metrics, vec![Metric::BlendedCost, Metric::UsageQuantity]);
        assert!(parse_list::<Metric>("BlendedCost,Bogus").is_err());
    }

    #[test]
    fn test_dimension_parsing_keeps_order() {
        let dims: Vec<Dimension> = parse_list("REGION,service,,LINKED_ACCOUNT").unwrap();
        assert_eq!(
            dims,
            vec![Dimension::Region, Dimension::Service, Dimension::LinkedAccount]
        );
    }

    #[test]
    fn test_group_by_preserves_order() {
        let q = query(vec![Dimension::UsageType, Dimension::Service]).unwrap();
        let group_by = q.group_by();
        assert_eq!(group_by.len(), 2);
        assert_eq!(group_by[0].key, "USAGE_TYPE");
        assert_eq!(group_by[1].key, "SERVICE");
        assert!(group_by.iter().all(|g| g.group_type == "DIMENSION"));

        let json = serde_json::to_value(&group_by[0]).unwrap();
        assert_eq!(json, serde_json::json!({"Type": "DIMENSION", "Key": "USAGE_TYPE"}));
    }

    #[test]
    fn test_rejects_inverted_date_range() {
        let err = UsageQuery::new(
            date("2023-02-01"),
            date("2023-01-01"),
            Granularity::Daily,
            vec![Metric::BlendedCost, Metric::UsageQuantity],
            Dimension::all(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_rejects_bad_dimension_lists() {
        assert!(matches!(query(vec![]), Err(ConfigError::NoDimensions)));
        assert!(matches!(
            query(vec![Dimension::Region, Dimension::Region]),
            Err(ConfigError::DuplicateDimension(Dimension::Region))
        ));
    }

    #[test]
    fn test_requires_cost_and_usage_metrics() {
        let only_usage = UsageQuery::new(
            date("2023-01-01"),
            date("2023-01-31"),
            Granularity::Daily,
            vec![Metric::UsageQuantity],
            Dimension::all(),
        );
        assert!(matches!(only_usage, Err(ConfigError::MissingCostMetric)));

        let only_cost = UsageQuery::new(
            date("2023-01-01"),
            date("2023-01-31"),
            Granularity::Daily,
            vec![Metric::UnblendedCost],
            Dimension::all(),
        );
        assert!(matches!(only_cost, Err(ConfigError::MissingUsageMetric)));
    }

    #[test]
    fn test_cost_metric_is_first_monetary_metric() {
        let q = UsageQuery::new(
            date("2023-01-01"),
            date("2023-01-31"),
            Granularity::Monthly,
            vec![Metric::UsageQuantity, Metric::AmortizedCost, Metric::BlendedCost],
            Dimension::all(),
        )
        .unwrap();
        assert_eq!(q.cost_metric(), Metric::AmortizedCost);
    }

    #[test]
    fn test_time_period_format() {
        let q = query(Dimension::all()).unwrap();
        assert_eq!(
            q.time_period(),
            ("2023-01-01".to_string(), "2023-01-31".to_string())
        );

        let hourly = UsageQuery::new(
            date("2023-01-01"),
            date("2023-01-02"),
            Granularity::Hourly,
            vec![Metric::BlendedCost, Metric::UsageQuantity],
            Dimension::all(),
        )
        .unwrap();
        assert_eq!(hourly.time_period().0, "2023-01-01T00:00:00Z");
    }
}
