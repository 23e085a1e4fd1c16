//! Usage table data models
//!
//! This module defines the flattened row written to the destination table.

use serde::{Deserialize, Serialize};

use crate::schemas::Dimension;

/// Placeholder stored when a group carries no annotation
pub const EMPTY_ANNOTATION: &str = "[]";

/// Column definition of the destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub nullable: bool,
}

const fn column(name: &'static str, nullable: bool) -> Column {
    Column { name, nullable }
}

/// Destination columns, in the order values are bound.
///
/// Every column is text: amounts stay the raw decimal strings sent by the
/// service and readers pick their own numeric type.
pub const COLUMNS: [Column; 11] = [
    column("timestamp", false),
    column("service", true),
    column("resource_type", true),
    column("region", true),
    column("usage_type", true),
    column("account", true),
    column("cost", false),
    column("usage_quantity", false),
    column("tags", false),
    column("savings_plans", false),
    column("currency", false),
];

/// One flattened cost/usage row.
///
/// Dimension fields are `None` when that dimension was not part of the
/// query grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Start of the time bucket the group belongs to
    pub timestamp: String,

    pub service: Option<String>,
    pub resource_type: Option<String>,
    pub region: Option<String>,
    pub usage_type: Option<String>,
    pub account: Option<String>,

    /// Raw amount of the query's cost metric
    pub cost: String,

    /// Raw amount of `UsageQuantity`
    pub usage_quantity: String,

    pub tags: String,
    pub savings_plans: String,
    pub currency: String,
}

impl UsageRecord {
    /// Store a group key in the field owned by `dimension`
    pub fn set_dimension(&mut self, dimension: Dimension, value: String) {
        let slot = match dimension {
            Dimension::Service => &mut self.service,
            Dimension::ResourceType => &mut self.resource_type,
            Dimension::Region => &mut self.region,
            Dimension::UsageType => &mut self.usage_type,
            Dimension::LinkedAccount => &mut self.account,
        };
        *slot = Some(value);
    }

    /// Values in `COLUMNS` order
    pub fn column_values(&self) -> [Option<String>; 11] {
        [
            Some(self.timestamp.clone()),
            self.service.clone(),
            self.resource_type.clone(),
            self.region.clone(),
            self.usage_type.clone(),
            self.account.clone(),
            Some(self.cost.clone()),
            Some(self.usage_quantity.clone()),
            Some(self.tags.clone()),
            Some(self.savings_plans.clone()),
            Some(self.currency.clone()),
        ]
    }
}

/// Ordered rows of one fetch, written as-is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageTable {
    pub records: Vec<UsageRecord>,

    /// Number of time buckets the rows came from
    pub buckets: usize,
}

impl UsageTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UsageRecord> {
        self.records.iter()
    }
}

/// Check that `name` can be used as an unquoted SQL identifier
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 63
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
