//! Derived performance metrics.
//!
//! Pure functions over already-computed snapshot series and ledger
//! state; nothing here does IO or mutates anything.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{AllocationSlice, SymbolGain, CASH_SYMBOL};
use crate::constants::DECIMAL_PRECISION;
use crate::portfolio::lots::{is_quantity_significant, LedgerState, LotDisposal};
use crate::portfolio::snapshot::DailySnapshot;

const DAYS_PER_YEAR: f64 = 365.25;

/// Annualizes the cumulative TWR of a snapshot series geometrically.
/// `None` for series spanning less than a full day or with a growth
/// factor that cannot be annualized (total loss or worse).
pub fn annualized_twr(snapshots: &[DailySnapshot]) -> Option<Decimal> {
    let first = snapshots.first()?;
    let last = snapshots.last()?;
    let days = (last.snapshot_date - first.snapshot_date).num_days();
    if days < 1 {
        return None;
    }

    let growth = (Decimal::ONE + last.cumulative_twr).to_f64()?;
    if growth <= 0.0 {
        return None;
    }
    Decimal::from_f64(growth.powf(DAYS_PER_YEAR / days as f64) - 1.0)
}

/// Simple return of value over contributed capital:
/// `(total_value - net_deposits) / net_deposits`. `None` when net
/// deposits are not positive (nothing meaningful to divide by).
pub fn simple_return(snapshot: &DailySnapshot) -> Option<Decimal> {
    if snapshot.net_deposits <= Decimal::ZERO {
        return None;
    }
    Some((snapshot.total_value - snapshot.net_deposits) / snapshot.net_deposits)
}

/// Unrealized gain per open position at the given current prices.
/// Positions without a price are skipped. Sorted by symbol.
pub fn unrealized_gains(
    ledger: &LedgerState,
    prices: &HashMap<String, Decimal>,
) -> Vec<SymbolGain> {
    let mut gains: Vec<SymbolGain> = ledger
        .positions
        .values()
        .filter(|position| is_quantity_significant(&position.quantity))
        .filter_map(|position| {
            let price = prices.get(&position.symbol)?;
            let market_value = position.quantity * price;
            Some(SymbolGain {
                symbol: position.symbol.clone(),
                quantity: position.quantity,
                cost_basis: position.total_cost_basis,
                market_value,
                unrealized_gain: market_value - position.total_cost_basis,
            })
        })
        .collect();
    gains.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    gains
}

/// Total realized gain across all disposals.
pub fn realized_gain_total(disposals: &[LotDisposal]) -> Decimal {
    disposals.iter().map(|d| d.realized_gain).sum()
}

/// Realized gain per symbol.
pub fn realized_gains_by_symbol(disposals: &[LotDisposal]) -> HashMap<String, Decimal> {
    let mut by_symbol: HashMap<String, Decimal> = HashMap::new();
    for disposal in disposals {
        *by_symbol.entry(disposal.symbol.clone()).or_default() += disposal.realized_gain;
    }
    by_symbol
}

/// Current allocation as fractions of total value, positions sorted by
/// symbol with settlement cash as a final `CASH` slice. Fractions are
/// zero when total value is not positive.
pub fn allocation(ledger: &LedgerState, prices: &HashMap<String, Decimal>) -> Vec<AllocationSlice> {
    let mut slices: Vec<AllocationSlice> = ledger
        .positions
        .values()
        .filter(|position| is_quantity_significant(&position.quantity))
        .filter_map(|position| {
            let price = prices.get(&position.symbol)?;
            Some(AllocationSlice {
                symbol: position.symbol.clone(),
                market_value: position.quantity * price,
                fraction: Decimal::ZERO,
            })
        })
        .collect();
    slices.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    if ledger.cash_balance != Decimal::ZERO {
        slices.push(AllocationSlice {
            symbol: CASH_SYMBOL.to_string(),
            market_value: ledger.cash_balance,
            fraction: Decimal::ZERO,
        });
    }

    let total: Decimal = slices.iter().map(|slice| slice.market_value).sum();
    if total > Decimal::ZERO {
        for slice in &mut slices {
            slice.fraction = (slice.market_value / total).round_dp(DECIMAL_PRECISION);
        }
    }
    slices
}
