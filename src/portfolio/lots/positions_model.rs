//! Position and tax-lot models.

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;

use crate::constants::QUANTITY_THRESHOLD;
use crate::errors::CalculatorError;

/// True when a quantity is large enough to count as an open position,
/// filtering out fractional-share rounding dust.
pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold = Decimal::from_str(QUANTITY_THRESHOLD).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// A discrete batch of a security acquired at one time and price,
/// tracked until fully disposed. A lot whose `quantity_remaining` has
/// reached zero is closed: it stays in the position for realized-gain
/// reporting but is never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    /// Id of the transaction that opened the lot.
    pub id: String,
    pub symbol: String,
    pub open_date: NaiveDate,
    pub quantity_acquired: Decimal,
    pub quantity_remaining: Decimal,
    pub cost_basis_per_unit: Decimal,
}

impl Lot {
    pub fn is_closed(&self) -> bool {
        !is_quantity_significant(&self.quantity_remaining)
    }

    /// Cost basis of the units still held.
    pub fn remaining_cost_basis(&self) -> Decimal {
        self.quantity_remaining * self.cost_basis_per_unit
    }
}

/// One FIFO consumption of a lot by a SELL or TRANSFER_OUT.
#[derive(Debug, Clone, PartialEq)]
pub struct LotConsumption {
    pub lot_id: String,
    pub open_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
}

/// Realized-gain record for one lot consumed by a SELL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LotDisposal {
    pub sell_transaction_id: String,
    pub lot_id: String,
    pub symbol: String,
    pub disposal_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub proceeds: Decimal,
    pub realized_gain: Decimal,
}

/// The tax lots for one symbol in one portfolio, with cached aggregates.
/// Lots are owned exclusively by the portfolio that created them; they
/// never span portfolios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub total_cost_basis: Decimal,
    pub inception_date: NaiveDate,
    #[serde(default)]
    pub lots: VecDeque<Lot>,
}

impl Position {
    pub fn new(portfolio_id: String, symbol: String, date: NaiveDate) -> Self {
        Position {
            portfolio_id,
            symbol,
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            total_cost_basis: Decimal::ZERO,
            inception_date: date,
            lots: VecDeque::new(),
        }
    }

    /// Recalculates cached aggregates from the lots.
    pub fn recalculate_aggregates(&mut self) {
        let total_quantity: Decimal = self.lots.iter().map(|lot| lot.quantity_remaining).sum();
        let total_cost_basis: Decimal = self.lots.iter().map(Lot::remaining_cost_basis).sum();

        if is_quantity_significant(&total_quantity) {
            self.quantity = total_quantity;
            self.total_cost_basis = total_cost_basis;
            self.average_cost = total_cost_basis / total_quantity;
        } else {
            self.quantity = Decimal::ZERO;
            self.total_cost_basis = Decimal::ZERO;
            self.average_cost = Decimal::ZERO;
        }

        if let Some(first_open) = self.lots.iter().map(|lot| lot.open_date).min() {
            self.inception_date = first_open;
        }
    }

    /// Opens a new lot. Returns the cost basis of the added lot.
    pub fn add_lot(
        &mut self,
        lot_id: String,
        open_date: NaiveDate,
        quantity: Decimal,
        cost_basis_per_unit: Decimal,
    ) -> Result<Decimal, CalculatorError> {
        if quantity <= Decimal::ZERO {
            return Err(CalculatorError::InvalidTransaction(format!(
                "Lot quantity must be positive, got {} for lot {}",
                quantity, lot_id
            )));
        }

        self.lots.push_back(Lot {
            id: lot_id,
            symbol: self.symbol.clone(),
            open_date,
            quantity_acquired: quantity,
            quantity_remaining: quantity,
            cost_basis_per_unit,
        });

        // Stable sort keeps same-day lots in insertion order.
        let mut lots: Vec<_> = self.lots.drain(..).collect();
        lots.sort_by_key(|lot| lot.open_date);
        self.lots = lots.into();

        self.recalculate_aggregates();
        Ok(quantity * cost_basis_per_unit)
    }

    /// Total quantity still open across all lots.
    pub fn open_quantity(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.quantity_remaining).sum()
    }

    /// Reduces the position oldest-lot-first.
    ///
    /// The caller must have verified that the open quantity can satisfy
    /// the reduction; an unfillable request here is a hard error, never
    /// clamped. Fully consumed lots are retained with zero remaining
    /// quantity.
    pub fn reduce_lots_fifo(
        &mut self,
        quantity_to_reduce: Decimal,
    ) -> Result<Vec<LotConsumption>, CalculatorError> {
        if quantity_to_reduce <= Decimal::ZERO {
            return Err(CalculatorError::InvalidTransaction(
                "Quantity to reduce must be positive".to_string(),
            ));
        }

        let mut remaining = quantity_to_reduce;
        let mut consumptions = Vec::new();

        for lot in self.lots.iter_mut() {
            if remaining <= Decimal::ZERO {
                break;
            }
            if lot.is_closed() {
                continue;
            }

            let taken = lot.quantity_remaining.min(remaining);
            let cost_basis = taken * lot.cost_basis_per_unit;
            lot.quantity_remaining -= taken;
            remaining -= taken;

            debug!(
                "FIFO: consumed {} of lot {} for {}, {} left in lot",
                taken, lot.id, lot.symbol, lot.quantity_remaining
            );
            consumptions.push(LotConsumption {
                lot_id: lot.id.clone(),
                open_date: lot.open_date,
                quantity: taken,
                cost_basis,
            });
        }

        if is_quantity_significant(&remaining) {
            return Err(CalculatorError::Calculation(format!(
                "FIFO reduction left {} unfilled for {} in portfolio {}",
                remaining, self.symbol, self.portfolio_id
            )));
        }

        self.recalculate_aggregates();
        Ok(consumptions)
    }

    /// Applies a stock split to every lot: quantities multiply by the
    /// ratio, per-unit cost divides by it, so total cost basis and
    /// realized-gain math are invariant through the split.
    pub fn apply_split(&mut self, ratio: Decimal) -> Result<(), CalculatorError> {
        if ratio <= Decimal::ZERO {
            return Err(CalculatorError::InvalidTransaction(format!(
                "Split ratio must be positive, got {} for {}",
                ratio, self.symbol
            )));
        }
        for lot in self.lots.iter_mut() {
            lot.quantity_acquired *= ratio;
            lot.quantity_remaining *= ratio;
            lot.cost_basis_per_unit /= ratio;
        }
        self.recalculate_aggregates();
        Ok(())
    }

    /// Open lots (non-zero remaining quantity), oldest first.
    pub fn open_lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(|lot| !lot.is_closed())
    }
}
