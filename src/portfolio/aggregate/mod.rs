//! Aggregate portfolios: datewise sums of member snapshots with the
//! return chain recomputed from the summed series.

pub mod aggregate_calculator;
mod aggregate_service;

pub use aggregate_calculator::{aggregate_on_date, build_aggregate_series};
pub use aggregate_service::*;
