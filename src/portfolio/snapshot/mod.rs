//! Daily valuation snapshots: calculator, models, orchestration.

mod snapshot_model;
pub mod snapshot_calculator;
mod snapshot_service;
mod snapshot_traits;

pub use snapshot_calculator::{build_daily_snapshots, SnapshotCalculationOutput};
pub use snapshot_model::*;
pub use snapshot_service::*;
pub use snapshot_traits::*;
