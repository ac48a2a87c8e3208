use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use super::performance_calculator::{
    allocation, annualized_twr, realized_gain_total, realized_gains_by_symbol, simple_return,
    unrealized_gains,
};
use crate::portfolio::lots::{LedgerState, LotDisposal};
use crate::portfolio::snapshot::DailySnapshot;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn snapshot(snapshot_date: NaiveDate, total_value: Decimal, cumulative_twr: Decimal) -> DailySnapshot {
    DailySnapshot {
        id: DailySnapshot::make_id("port-1", snapshot_date),
        portfolio_id: "port-1".to_string(),
        snapshot_date,
        total_value,
        cash_balance: Decimal::ZERO,
        net_deposits: dec!(100),
        external_cash_flow: Decimal::ZERO,
        investment_income: Decimal::ZERO,
        cumulative_twr,
        calculated_at: Utc::now().naive_utc(),
    }
}

fn ledger_with_position(symbol: &str, quantity: Decimal, cost_per_unit: Decimal) -> LedgerState {
    let mut state = LedgerState::new("port-1");
    let mut position = crate::portfolio::lots::Position::new(
        "port-1".to_string(),
        symbol.to_string(),
        date(2024, 1, 2),
    );
    position
        .add_lot("t1".to_string(), date(2024, 1, 2), quantity, cost_per_unit)
        .unwrap();
    state.positions.insert(symbol.to_string(), position);
    state
}

fn disposal(symbol: &str, realized_gain: Decimal) -> LotDisposal {
    LotDisposal {
        sell_transaction_id: "sell-1".to_string(),
        lot_id: "lot-1".to_string(),
        symbol: symbol.to_string(),
        disposal_date: date(2024, 6, 1),
        quantity: dec!(1),
        cost_basis: dec!(10),
        proceeds: dec!(10) + realized_gain,
        realized_gain,
    }
}

#[test]
fn test_annualized_twr_over_one_year() {
    let series = vec![
        snapshot(date(2024, 1, 1), dec!(100), Decimal::ZERO),
        snapshot(date(2025, 1, 1), dec!(110), dec!(0.1)),
    ];

    // 366 calendar days, so slightly under the raw 10%.
    let annualized = annualized_twr(&series).unwrap();
    assert!((annualized - dec!(0.0998)).abs() < dec!(0.001));
}

#[test]
fn test_annualized_twr_degenerate_cases() {
    assert!(annualized_twr(&[]).is_none());

    let same_day = vec![snapshot(date(2024, 1, 1), dec!(100), dec!(0.05))];
    assert!(annualized_twr(&same_day).is_none());

    let wiped_out = vec![
        snapshot(date(2024, 1, 1), dec!(100), Decimal::ZERO),
        snapshot(date(2024, 6, 1), dec!(0), dec!(-1)),
    ];
    assert!(annualized_twr(&wiped_out).is_none());
}

#[test]
fn test_simple_return_vs_net_deposits() {
    let last = snapshot(date(2024, 6, 1), dec!(110), dec!(0.1));
    assert_eq!(simple_return(&last), Some(dec!(0.1)));

    let mut no_deposits = last;
    no_deposits.net_deposits = Decimal::ZERO;
    assert!(simple_return(&no_deposits).is_none());
}

#[test]
fn test_unrealized_gains_at_current_prices() {
    let ledger = ledger_with_position("AAPL", dec!(10), dec!(10));
    let mut prices = HashMap::new();
    prices.insert("AAPL".to_string(), dec!(15));

    let gains = unrealized_gains(&ledger, &prices);
    assert_eq!(gains.len(), 1);
    assert_eq!(gains[0].symbol, "AAPL");
    assert_eq!(gains[0].market_value, dec!(150));
    assert_eq!(gains[0].unrealized_gain, dec!(50));
}

#[test]
fn test_unrealized_gains_skips_unpriced_symbols() {
    let ledger = ledger_with_position("PRIVATECO", dec!(10), dec!(10));
    let gains = unrealized_gains(&ledger, &HashMap::new());
    assert!(gains.is_empty());
}

#[test]
fn test_realized_gains_total_and_by_symbol() {
    let disposals = vec![
        disposal("AAPL", dec!(50)),
        disposal("AAPL", dec!(-10)),
        disposal("MSFT", dec!(25)),
    ];

    assert_eq!(realized_gain_total(&disposals), dec!(65));

    let by_symbol = realized_gains_by_symbol(&disposals);
    assert_eq!(by_symbol["AAPL"], dec!(40));
    assert_eq!(by_symbol["MSFT"], dec!(25));
}

#[test]
fn test_allocation_fractions_include_cash() {
    let mut ledger = ledger_with_position("AAPL", dec!(10), dec!(10));
    ledger.cash_balance = dec!(50);
    let mut prices = HashMap::new();
    prices.insert("AAPL".to_string(), dec!(15));

    let slices = allocation(&ledger, &prices);
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].symbol, "AAPL");
    assert_eq!(slices[0].fraction, dec!(0.75));
    assert_eq!(slices[1].symbol, "CASH");
    assert_eq!(slices[1].fraction, dec!(0.25));
}

#[test]
fn test_allocation_zero_total_has_zero_fractions() {
    let ledger = LedgerState::new("port-1");
    assert!(allocation(&ledger, &HashMap::new()).is_empty());
}
