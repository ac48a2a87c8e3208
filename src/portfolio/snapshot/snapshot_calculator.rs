//! Pure snapshot calculator.
//!
//! Walks calendar days from the first transaction date, replays each
//! day's transactions through the lot engine, values open lots at the
//! day's closes and derives external cash flow as a residual of the
//! value identity. No IO: transactions and quotes are pre-fetched by the
//! service layer.

use chrono::{NaiveDate, Utc};
use log::warn;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::Result;
use crate::portfolio::lots::{is_quantity_significant, LedgerState, LotEngine};
use crate::portfolio::snapshot::{CalculationWarning, DailySnapshot, PriceCoverageGap};
use crate::quotes::Quote;
use crate::settings::EngineSettings;
use crate::transactions::{Transaction, TransactionType};
use crate::utils::time_utils::get_days_between;

/// Per-symbol close prices keyed by date, for carry-forward lookup.
pub type PriceBook = HashMap<String, BTreeMap<NaiveDate, Decimal>>;

/// Result of a full snapshot calculation: the daily series, the final
/// ledger state (open lots and disposals for reporting) and everything
/// non-fatal observed along the way.
#[derive(Debug, Clone)]
pub struct SnapshotCalculationOutput {
    pub snapshots: Vec<DailySnapshot>,
    pub ledger: LedgerState,
    pub coverage_gaps: Vec<PriceCoverageGap>,
    pub warnings: Vec<CalculationWarning>,
}

impl SnapshotCalculationOutput {
    fn empty(portfolio_id: &str) -> Self {
        SnapshotCalculationOutput {
            snapshots: Vec::new(),
            ledger: LedgerState::new(portfolio_id),
            coverage_gaps: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Indexes quotes by symbol and date.
pub fn build_price_book(quotes: &[Quote]) -> PriceBook {
    let mut book: PriceBook = HashMap::new();
    for quote in quotes {
        book.entry(quote.symbol.clone())
            .or_default()
            .insert(quote.quote_date, quote.close);
    }
    book
}

/// Most recent close at or before `date`. Never reads future quotes.
fn price_at(book: &PriceBook, symbol: &str, date: NaiveDate) -> Option<Decimal> {
    book.get(symbol)
        .and_then(|closes| closes.range(..=date).next_back())
        .map(|(_, close)| *close)
}

/// Values all open lots at the given date's closes. `split_scale` holds
/// per-symbol factors for symbols splitting today, applied when valuing
/// pre-split quantities against post-split closes. Symbols without any
/// usable price contribute $0 and are collected into `missing`.
fn market_value(
    state: &LedgerState,
    book: &PriceBook,
    date: NaiveDate,
    split_scale: Option<&HashMap<String, Decimal>>,
    missing: &mut BTreeSet<(String, NaiveDate)>,
) -> Decimal {
    let mut value = Decimal::ZERO;
    for (symbol, position) in &state.positions {
        let quantity = position.open_quantity();
        if !is_quantity_significant(&quantity) {
            continue;
        }
        match price_at(book, symbol, date) {
            Some(close) => {
                let scale = split_scale
                    .and_then(|scales| scales.get(symbol))
                    .copied()
                    .unwrap_or(Decimal::ONE);
                value += quantity * close * scale;
            }
            None => {
                missing.insert((symbol.clone(), date));
            }
        }
    }
    value
}

/// Merges per-symbol missing-price days into contiguous ranges.
fn merge_coverage_gaps(missing: &BTreeSet<(String, NaiveDate)>) -> Vec<PriceCoverageGap> {
    let mut gaps: Vec<PriceCoverageGap> = Vec::new();
    for (symbol, date) in missing {
        match gaps.last_mut() {
            Some(gap)
                if gap.symbol == *symbol
                    && gap.end_date.succ_opt() == Some(*date) =>
            {
                gap.end_date = *date;
            }
            _ => gaps.push(PriceCoverageGap {
                symbol: symbol.clone(),
                start_date: *date,
                end_date: *date,
            }),
        }
    }
    gaps
}

/// Builds the full daily snapshot series for one portfolio, from its
/// first transaction date through `end_date` inclusive.
pub fn build_daily_snapshots(
    portfolio_id: &str,
    transactions: &[Transaction],
    quotes: &[Quote],
    settings: &EngineSettings,
    end_date: NaiveDate,
) -> Result<SnapshotCalculationOutput> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.order_key());

    let start_date = match ordered.first() {
        Some(first) => first.trade_date,
        None => return Ok(SnapshotCalculationOutput::empty(portfolio_id)),
    };

    let mut output = SnapshotCalculationOutput::empty(portfolio_id);
    if end_date < start_date {
        output.warnings.push(CalculationWarning {
            date: None,
            message: format!(
                "End date {} precedes first transaction date {} for portfolio {}",
                end_date, start_date, portfolio_id
            ),
        });
        return Ok(output);
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<&Transaction>> = BTreeMap::new();
    for tx in &ordered {
        by_date.entry(tx.trade_date).or_default().push(*tx);
    }

    let book = build_price_book(quotes);
    let engine = LotEngine::new(settings.clone());
    let mut state = LedgerState::new(portfolio_id);
    let mut missing: BTreeSet<(String, NaiveDate)> = BTreeSet::new();

    let mut prev_total_value: Option<Decimal> = None;
    let mut cumulative_twr = Decimal::ZERO;
    let mut net_deposits = Decimal::ZERO;
    let calculated_at = Utc::now().naive_utc();

    for date in get_days_between(start_date, end_date) {
        let todays_transactions = by_date.get(&date);

        // Splits effective today scale the pre-transaction price so that
        // pre-split quantities meet post-split closes consistently.
        let mut split_scale: HashMap<String, Decimal> = HashMap::new();
        if let Some(txs) = todays_transactions {
            for tx in txs {
                if tx.tx_type() == TransactionType::Split {
                    if let (Some(symbol), Some(ratio)) = (&tx.symbol, tx.split_ratio) {
                        let factor = split_scale.entry(symbol.clone()).or_insert(Decimal::ONE);
                        *factor *= ratio;
                    }
                }
            }
        }

        let pre_tx_value = market_value(&state, &book, date, Some(&split_scale), &mut missing)
            + state.cash_balance;

        let mut investment_income = Decimal::ZERO;
        if let Some(txs) = todays_transactions {
            for tx in txs {
                let effect = engine.apply_transaction(&mut state, tx)?;
                investment_income += effect.investment_income;
            }
        }

        let total_value =
            market_value(&state, &book, date, None, &mut missing) + state.cash_balance;
        let external_cash_flow = total_value - pre_tx_value - investment_income;

        let daily_return = match prev_total_value {
            Some(prev) if prev > Decimal::ZERO => {
                let denominator = prev + external_cash_flow;
                if denominator <= Decimal::ZERO {
                    warn!(
                        "Degenerate return denominator {} for portfolio {} on {}; \
                         daily return forced to zero",
                        denominator, portfolio_id, date
                    );
                    output.warnings.push(CalculationWarning::on_date(
                        date,
                        format!("Degenerate return denominator {}", denominator),
                    ));
                    Decimal::ZERO
                } else {
                    total_value / denominator - Decimal::ONE
                }
            }
            _ => Decimal::ZERO,
        };
        cumulative_twr =
            (Decimal::ONE + cumulative_twr) * (Decimal::ONE + daily_return) - Decimal::ONE;
        net_deposits += external_cash_flow;

        if todays_transactions.is_some() && state.cash_balance.is_sign_negative() {
            output.warnings.push(CalculationWarning::on_date(
                date,
                format!("Negative settlement cash balance {}", state.cash_balance),
            ));
        }

        output.snapshots.push(DailySnapshot {
            id: DailySnapshot::make_id(portfolio_id, date),
            portfolio_id: portfolio_id.to_string(),
            snapshot_date: date,
            total_value,
            cash_balance: state.cash_balance,
            net_deposits,
            external_cash_flow,
            investment_income,
            cumulative_twr,
            calculated_at,
        });

        prev_total_value = Some(total_value);
    }

    output.coverage_gaps = merge_coverage_gaps(&missing);
    output.ledger = state;
    Ok(output)
}
