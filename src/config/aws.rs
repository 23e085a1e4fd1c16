//! AWS SDK configuration
//!
//! This module builds the Cost Explorer client, supporting explicit access
//! keys and custom endpoint URLs for local development and testing.

use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region, SdkConfig};
use aws_sdk_costexplorer::config::Credentials;
use aws_sdk_costexplorer::Client as CostExplorerClient;

use crate::config::Settings;

/// Provider name attached to credentials taken from settings
const STATIC_CREDENTIALS_PROVIDER: &str = "cost-explorer-loader-settings";

/// AWS configuration builder
///
/// Creates AWS SDK configuration with support for:
/// - Custom regions
/// - Static access keys from settings, falling back to the default chain
/// - Custom endpoint URLs for local testing
pub struct AwsConfigBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> AwsConfigBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build the base AWS SDK configuration.
    ///
    /// Credentials are not checked here; a bad key pair only shows up on the
    /// first request.
    pub async fn build_sdk_config(&self) -> SdkConfig {
        let region_provider =
            RegionProviderChain::first_try(Region::new(self.settings.aws_region.clone()))
                .or_default_provider();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        if let Some((access_key_id, secret_access_key)) = self.settings.static_credentials() {
            tracing::debug!("Using AWS credentials from settings");
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                STATIC_CREDENTIALS_PROVIDER,
            ));
        }

        loader.load().await
    }

    /// Create a Cost Explorer client with optional custom endpoint
    ///
    /// If `COST_EXPLORER_ENDPOINT_URL` is set in settings, the client will
    /// use that endpoint (useful for LocalStack or mocks).
    pub async fn build_cost_explorer_client(&self) -> CostExplorerClient {
        let sdk_config = self.build_sdk_config().await;

        if let Some(endpoint_url) = &self.settings.cost_explorer_endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom Cost Explorer endpoint");

            let ce_config = aws_sdk_costexplorer::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint_url)
                .build();

            CostExplorerClient::from_conf(ce_config)
        } else {
            CostExplorerClient::new(&sdk_config)
        }
    }
}

/// Build AWS SDK config from settings (convenience function)
pub async fn build_aws_config(settings: &Settings) -> SdkConfig {
    AwsConfigBuilder::new(settings).build_sdk_config().await
}

/// Create a Cost Explorer client from settings (convenience function)
pub async fn create_cost_explorer_client(settings: &Settings) -> CostExplorerClient {
    AwsConfigBuilder::new(settings).build_cost_explorer_client().await
}
