//! Request and response schemas
//!
//! Query vocabulary and the Cost Explorer response model.

pub mod cost_explorer;
pub mod query;

pub use cost_explorer::{CostAndUsageResponse, DateInterval, Group, MetricValue, ResultByTime};
pub use query::{parse_list, Dimension, Granularity, GroupBy, Metric, UsageQuery};
