//! Derived performance metric models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label used for the settlement cash slice in allocations.
pub const CASH_SYMBOL: &str = "CASH";

/// Unrealized gain for one open position at current prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolGain {
    pub symbol: String,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
    pub unrealized_gain: Decimal,
}

/// One slice of the current allocation, as a fraction of total value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub symbol: String,
    pub market_value: Decimal,
    pub fraction: Decimal,
}
