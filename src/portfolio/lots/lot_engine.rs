//! Transaction replay: lots and settlement cash, strictly in ledger order.

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::{CalculatorError, Result};
use crate::portfolio::lots::{is_quantity_significant, LotConsumption, LotDisposal, Position};
use crate::settings::EngineSettings;
use crate::transactions::{Transaction, TransactionType};

/// The evolving lot and cash state of one portfolio during a replay.
/// Positions are keyed by symbol; the settlement cash balance is a
/// first-class running scalar, updated only in transaction order and
/// never estimated.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub portfolio_id: String,
    pub positions: HashMap<String, Position>,
    pub cash_balance: Decimal,
    pub disposals: Vec<LotDisposal>,
}

impl LedgerState {
    pub fn new(portfolio_id: impl Into<String>) -> Self {
        LedgerState {
            portfolio_id: portfolio_id.into(),
            positions: HashMap::new(),
            cash_balance: Decimal::ZERO,
            disposals: Vec::new(),
        }
    }

    fn position_mut(&mut self, symbol: &str, date: NaiveDate) -> &mut Position {
        let portfolio_id = self.portfolio_id.clone();
        self.positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(portfolio_id, symbol.to_string(), date))
    }

    /// Open quantity for a symbol, zero when no position exists.
    pub fn open_quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(Position::open_quantity)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Cash and income effect of a single replayed transaction. The snapshot
/// calculator accumulates `investment_income` per day; `cash_delta` is
/// already applied to the state when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransactionEffect {
    pub cash_delta: Decimal,
    pub investment_income: Decimal,
}

/// Replays transactions into tax lots and settlement cash.
///
/// The engine never mutates transactions and never classifies them as
/// internal/external cash flows; it only maps each type to its lot and
/// cash effect. Types it does not recognize get a $0 effect and are
/// retained in the log untouched.
#[derive(Debug, Clone, Default)]
pub struct LotEngine {
    settings: EngineSettings,
}

impl LotEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Replays the full transaction list for a portfolio from scratch.
    /// Transactions are processed in `(trade_date, sequence)` order, so a
    /// rebuild from the same set is always bit-identical.
    pub fn rebuild_lots(
        &self,
        portfolio_id: &str,
        transactions: &[Transaction],
    ) -> Result<LedgerState> {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|tx| tx.order_key());

        let mut state = LedgerState::new(portfolio_id);
        for tx in ordered {
            self.apply_transaction(&mut state, tx)?;
        }
        Ok(state)
    }

    /// Applies one transaction to the state, returning its cash/income
    /// effect. Position inconsistencies (over-selling) are hard errors;
    /// everything else degrades to a logged $0 effect.
    pub fn apply_transaction(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
    ) -> Result<TransactionEffect> {
        let effect = match tx.tx_type() {
            TransactionType::Buy => self.handle_acquisition(state, tx)?,
            TransactionType::Drip => self.handle_drip(state, tx)?,
            TransactionType::Dividend => self.handle_dividend(state, tx)?,
            TransactionType::Interest => self.handle_interest(state, tx),
            TransactionType::Fee => self.handle_fee(state, tx),
            TransactionType::SweepIn => self.handle_sweep(state, tx, Decimal::ONE),
            TransactionType::SweepOut => self.handle_sweep(state, tx, Decimal::NEGATIVE_ONE),
            TransactionType::Sell => self.handle_sell(state, tx)?,
            TransactionType::TransferIn => self.handle_transfer_in(state, tx)?,
            TransactionType::TransferOut => self.handle_transfer_out(state, tx)?,
            TransactionType::Split => self.handle_split(state, tx)?,
            TransactionType::Unknown => {
                debug!(
                    "Transaction {} has unmapped type '{}'; $0 effect, retained for audit",
                    tx.id, tx.transaction_type
                );
                TransactionEffect::default()
            }
        };

        if state.cash_balance.is_sign_negative() {
            warn!(
                "Settlement cash for portfolio {} is negative ({}) after transaction {} on {}",
                state.portfolio_id, state.cash_balance, tx.id, tx.trade_date
            );
        }

        Ok(effect)
    }

    /// Cost basis per unit for an acquisition: the all-in amount (plus
    /// fees) when present, otherwise the stated unit price, otherwise the
    /// configured default.
    fn acquisition_unit_cost(&self, tx: &Transaction, quantity: Decimal) -> Decimal {
        if tx.amt() != Decimal::ZERO {
            (tx.amt().abs() + tx.fee_amt().abs()) / quantity
        } else if tx.price() != Decimal::ZERO {
            (tx.price() * quantity + tx.fee_amt().abs()) / quantity
        } else {
            self.settings.default_unit_cost
        }
    }

    /// BUY and the lot-opening half of TRANSFER_IN. Opens a lot; cash is
    /// not touched because the broker pairs trades with explicit sweeps.
    fn handle_acquisition(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
    ) -> Result<TransactionEffect> {
        let (symbol, quantity) = match (&tx.symbol, tx.qty()) {
            // Zero is sign-positive in rust_decimal, so the guard must
            // go through the significance threshold.
            (Some(symbol), quantity)
                if is_quantity_significant(&quantity) && quantity.is_sign_positive() =>
            {
                (symbol, quantity)
            }
            _ => {
                debug!(
                    "Acquisition {} has no symbol or quantity; no lot effect",
                    tx.id
                );
                return Ok(TransactionEffect::default());
            }
        };

        let unit_cost = self.acquisition_unit_cost(tx, quantity);
        state
            .position_mut(symbol, tx.trade_date)
            .add_lot(tx.id.clone(), tx.trade_date, quantity, unit_cost)?;
        Ok(TransactionEffect::default())
    }

    /// DRIP: dividend reinvestment. A reinvestment into the settlement
    /// fund is just cash; anything else opens a lot at the reinvestment
    /// price with zero net cash impact.
    fn handle_drip(&self, state: &mut LedgerState, tx: &Transaction) -> Result<TransactionEffect> {
        if let Some(symbol) = &tx.symbol {
            if self.settings.is_settlement_symbol(symbol) {
                let credit = tx.amt().abs();
                state.cash_balance += credit;
                return Ok(TransactionEffect {
                    cash_delta: credit,
                    investment_income: Decimal::ZERO,
                });
            }
        }
        self.handle_acquisition(state, tx)
    }

    /// DIVIDEND: reinvested when a symbol and share quantity are present
    /// (opens a lot, no cash), otherwise paid to the settlement balance
    /// and counted as investment income.
    fn handle_dividend(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
    ) -> Result<TransactionEffect> {
        let reinvested = tx.symbol.is_some() && is_quantity_significant(&tx.qty());
        if reinvested {
            return self.handle_acquisition(state, tx);
        }
        let credit = tx.amt();
        state.cash_balance += credit;
        Ok(TransactionEffect {
            cash_delta: credit,
            investment_income: credit,
        })
    }

    /// INTEREST: always a cash credit and investment income.
    fn handle_interest(&self, state: &mut LedgerState, tx: &Transaction) -> TransactionEffect {
        let credit = tx.amt();
        state.cash_balance += credit;
        TransactionEffect {
            cash_delta: credit,
            investment_income: credit,
        }
    }

    /// FEE: debits settlement cash and counts as negative investment
    /// income, so the external-cash-flow residual nets to zero for it.
    fn handle_fee(&self, state: &mut LedgerState, tx: &Transaction) -> TransactionEffect {
        let charge = if tx.amt() != Decimal::ZERO {
            tx.amt().abs()
        } else {
            tx.fee_amt().abs()
        };
        if charge == Decimal::ZERO {
            debug!("Fee transaction {} has zero amount and fee", tx.id);
            return TransactionEffect::default();
        }
        state.cash_balance -= charge;
        TransactionEffect {
            cash_delta: -charge,
            investment_income: -charge,
        }
    }

    /// SWEEP_IN / SWEEP_OUT move money between the settlement fund and
    /// the outside world or invested positions; `direction` is +1/-1.
    fn handle_sweep(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
        direction: Decimal,
    ) -> TransactionEffect {
        let delta = tx.amt().abs() * direction;
        state.cash_balance += delta;
        TransactionEffect {
            cash_delta: delta,
            investment_income: Decimal::ZERO,
        }
    }

    /// SELL: FIFO lot relief with realized-gain disposal records. Selling
    /// more than the open lot quantity is a ledger inconsistency and
    /// fails the replay.
    fn handle_sell(&self, state: &mut LedgerState, tx: &Transaction) -> Result<TransactionEffect> {
        let (symbol, quantity) = match (&tx.symbol, tx.qty().abs()) {
            (Some(symbol), quantity) if is_quantity_significant(&quantity) => {
                (symbol.clone(), quantity)
            }
            _ => {
                debug!("Sell {} has no symbol or quantity; no lot effect", tx.id);
                return Ok(TransactionEffect::default());
            }
        };

        self.check_available(state, tx, &symbol, quantity)?;

        let proceeds = if tx.amt() != Decimal::ZERO {
            tx.amt().abs() - tx.fee_amt().abs()
        } else {
            tx.price() * quantity - tx.fee_amt().abs()
        };
        let proceeds_per_unit = proceeds / quantity;

        let consumptions = self.reduce_position(state, tx, &symbol, quantity)?;
        for consumption in consumptions {
            let lot_proceeds = consumption.quantity * proceeds_per_unit;
            state.disposals.push(LotDisposal {
                sell_transaction_id: tx.id.clone(),
                lot_id: consumption.lot_id,
                symbol: symbol.clone(),
                disposal_date: tx.trade_date,
                quantity: consumption.quantity,
                cost_basis: consumption.cost_basis,
                proceeds: lot_proceeds,
                realized_gain: lot_proceeds - consumption.cost_basis,
            });
        }
        Ok(TransactionEffect::default())
    }

    /// TRANSFER_IN: with a symbol, opens a lot (cost from unit price,
    /// else total amount, else the configured default); without one it is
    /// a cash credit.
    fn handle_transfer_in(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
    ) -> Result<TransactionEffect> {
        if tx.symbol.is_some() && is_quantity_significant(&tx.qty()) {
            return self.handle_acquisition(state, tx);
        }
        let credit = tx.amt().abs();
        state.cash_balance += credit;
        Ok(TransactionEffect {
            cash_delta: credit,
            investment_income: Decimal::ZERO,
        })
    }

    /// TRANSFER_OUT: with a symbol, FIFO lot relief without disposal
    /// records (no proceeds, no realized gain); without one it is a cash
    /// debit.
    fn handle_transfer_out(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
    ) -> Result<TransactionEffect> {
        match (&tx.symbol, tx.qty().abs()) {
            (Some(symbol), quantity) if is_quantity_significant(&quantity) => {
                let symbol = symbol.clone();
                self.check_available(state, tx, &symbol, quantity)?;
                self.reduce_position(state, tx, &symbol, quantity)?;
                Ok(TransactionEffect::default())
            }
            _ => {
                let debit = tx.amt().abs();
                state.cash_balance -= debit;
                Ok(TransactionEffect {
                    cash_delta: -debit,
                    investment_income: Decimal::ZERO,
                })
            }
        }
    }

    /// SPLIT: adjusts every lot of the symbol by the ratio. A split for a
    /// symbol never held is a no-op.
    fn handle_split(&self, state: &mut LedgerState, tx: &Transaction) -> Result<TransactionEffect> {
        let (symbol, ratio) = match (&tx.symbol, tx.split_ratio) {
            (Some(symbol), Some(ratio)) => (symbol, ratio),
            _ => {
                debug!("Split {} is missing a symbol or ratio; skipped", tx.id);
                return Ok(TransactionEffect::default());
            }
        };
        if let Some(position) = state.positions.get_mut(symbol) {
            position.apply_split(ratio)?;
        }
        Ok(TransactionEffect::default())
    }

    fn check_available(
        &self,
        state: &LedgerState,
        tx: &Transaction,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<()> {
        let available = state.open_quantity(symbol);
        let shortfall = quantity - available;
        if is_quantity_significant(&shortfall) && shortfall.is_sign_positive() {
            return Err(CalculatorError::InsufficientQuantity {
                portfolio_id: state.portfolio_id.clone(),
                symbol: symbol.to_string(),
                date: tx.trade_date,
                transaction_id: tx.id.clone(),
                requested: quantity,
                available,
            }
            .into());
        }
        Ok(())
    }

    fn reduce_position(
        &self,
        state: &mut LedgerState,
        tx: &Transaction,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<Vec<LotConsumption>> {
        let position = state.positions.get_mut(symbol).ok_or_else(|| {
            CalculatorError::PositionNotFound {
                portfolio_id: tx.portfolio_id.clone(),
                symbol: symbol.to_string(),
            }
        })?;
        Ok(position.reduce_lots_fifo(quantity)?)
    }
}
