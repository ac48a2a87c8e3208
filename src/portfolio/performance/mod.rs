//! Derived performance metrics over snapshots, lots and disposals.

pub mod performance_calculator;
mod performance_model;

pub use performance_calculator::*;
pub use performance_model::*;

#[cfg(test)]
mod performance_calculator_tests;
