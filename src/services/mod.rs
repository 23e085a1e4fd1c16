//! Services module
//!
//! Contains the Cost Explorer client wrapper and the usage fetch stage.

pub mod cost_explorer;
pub mod usage_fetcher;

pub use cost_explorer::{CostExplorerService, CostSource};
pub use usage_fetcher::{flatten_response, resolve_currency, UsageFetcher};
