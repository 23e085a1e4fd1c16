//! Cost Explorer service
//!
//! Issues the single `GetCostAndUsage` call of a run. The `CostSource`
//! trait is the seam the fetch stage depends on, so tests can substitute a
//! canned response for the live service.

use async_trait::async_trait;
use aws_sdk_costexplorer::types::{
    DateInterval, Granularity as SdkGranularity, GroupDefinition, GroupDefinitionType,
};
use aws_sdk_costexplorer::Client as CostExplorerClient;

use crate::error::FetchError;
use crate::schemas::{CostAndUsageResponse, UsageQuery};

/// Anything that can answer a cost and usage query
#[async_trait]
pub trait CostSource: Send + Sync {
    async fn get_cost_and_usage(&self, query: &UsageQuery) -> Result<CostAndUsageResponse, FetchError>;
}

/// Service for the AWS Cost Explorer API
#[derive(Clone)]
pub struct CostExplorerService {
    client: CostExplorerClient,
}

impl CostExplorerService {
    pub fn new(client: CostExplorerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CostSource for CostExplorerService {
    async fn get_cost_and_usage(&self, query: &UsageQuery) -> Result<CostAndUsageResponse, FetchError> {
        let (start, end) = query.time_period();
        let time_period = DateInterval::builder()
            .start(&start)
            .end(&end)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let group_by = query
            .group_by()
            .into_iter()
            .map(|group| {
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::from(group.group_type))
                    .key(group.key)
                    .build()
            })
            .collect::<Vec<_>>();

        let metrics = query
            .metrics()
            .iter()
            .map(|m| m.as_str().to_string())
            .collect::<Vec<_>>();

        tracing::debug!(
            start = %start,
            end = %end,
            granularity = %query.granularity(),
            metrics = ?metrics,
            group_by = ?query.dimensions(),
            "Calling Cost Explorer GetCostAndUsage"
        );

        let output = self
            .client
            .get_cost_and_usage()
            .time_period(time_period)
            .granularity(SdkGranularity::from(query.granularity().as_str()))
            .set_metrics(Some(metrics))
            .set_group_by(Some(group_by))
            .send()
            .await
            .map_err(FetchError::from_sdk_error)?;

        CostAndUsageResponse::try_from(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Dimension, Granularity, Metric};
    use aws_sdk_costexplorer::config::retry::RetryConfig;
    use aws_sdk_costexplorer::config::{BehaviorVersion, Credentials, Region};

    #[test]
    fn test_sdk_enum_conversions() {
        assert_eq!(SdkGranularity::from("DAILY"), SdkGranularity::Daily);
        assert_eq!(SdkGranularity::from("HOURLY"), SdkGranularity::Hourly);
        assert_eq!(GroupDefinitionType::from("DIMENSION"), GroupDefinitionType::Dimension);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_fetch_error() {
        let config = aws_sdk_costexplorer::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKID", "SECRET", None, None, "test"))
            .endpoint_url("http://127.0.0.1:1")
            .retry_config(RetryConfig::disabled())
            .build();
        let service = CostExplorerService::new(CostExplorerClient::from_conf(config));
        let query = UsageQuery::new(
            "2023-01-01".parse().unwrap(),
            "2023-01-31".parse().unwrap(),
            Granularity::Daily,
            vec![Metric::BlendedCost, Metric::UsageQuantity],
            Dimension::all(),
        )
        .unwrap();

        let err = service.get_cost_and_usage(&query).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "unexpected error: {err}");
    }
}
