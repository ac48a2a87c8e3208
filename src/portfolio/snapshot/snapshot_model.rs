//! Snapshot domain models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One valuation snapshot per portfolio per calendar day.
///
/// Snapshots are only ever produced by a full rebuild from the first
/// transaction date; there is no incremental append path, so a stored
/// series is always internally consistent (cumulative TWR chains from
/// day one).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot {
    /// `"{portfolio_id}_{snapshot_date}"`, unique per portfolio and day.
    pub id: String,
    pub portfolio_id: String,
    pub snapshot_date: NaiveDate,

    /// Market value of all open lots plus settlement cash.
    pub total_value: Decimal,
    pub cash_balance: Decimal,

    /// Running sum of external cash flow since inception.
    pub net_deposits: Decimal,

    /// Residual: `total_value - pre_tx_value - investment_income`.
    pub external_cash_flow: Decimal,

    /// Dividends and interest paid to cash (fees negative) on this day.
    pub investment_income: Decimal,

    /// Time-weighted return chained multiplicatively since inception,
    /// seeded at zero on the first day.
    pub cumulative_twr: Decimal,

    pub calculated_at: NaiveDateTime,
}

impl DailySnapshot {
    pub fn make_id(portfolio_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", portfolio_id, date.format("%Y-%m-%d"))
    }
}

/// A contiguous run of days on which a held symbol had no stored close
/// at or before the valuation date and was valued at $0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceCoverageGap {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A non-fatal condition observed during a rebuild (degenerate TWR
/// denominator, negative cash). Attached to the report, never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculationWarning {
    pub date: Option<NaiveDate>,
    pub message: String,
}

impl CalculationWarning {
    pub fn on_date(date: NaiveDate, message: impl Into<String>) -> Self {
        CalculationWarning {
            date: Some(date),
            message: message.into(),
        }
    }
}

/// Summary returned by a snapshot rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub portfolio_id: String,
    pub days_calculated: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub coverage_gaps: Vec<PriceCoverageGap>,
    pub warnings: Vec<CalculationWarning>,
}
