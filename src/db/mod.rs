//! Database module
//!
//! Contains the flattened usage row model and the table loader.

pub mod loader;
pub mod models;

pub use loader::{LoadMode, LoadOutcome, TableLoader};
pub use models::{UsageRecord, UsageTable};
