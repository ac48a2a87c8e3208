//! Engine configuration.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::DEFAULT_SETTLEMENT_SYMBOL;
use crate::utils::time_utils::DEFAULT_VALUATION_TZ;

/// Tunable knobs for the lot engine and snapshot calculator.
///
/// All fields default to values that match a plain US brokerage ledger,
/// so the engine is usable without any configuration source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Symbols treated as the settlement (sweep) fund. A DRIP into one of
    /// these credits the cash balance instead of opening a lot.
    #[serde(default = "default_settlement_symbols")]
    pub settlement_symbols: HashSet<String>,

    /// Cost basis per unit applied to acquisitions that carry neither an
    /// amount nor a unit price.
    #[serde(default)]
    pub default_unit_cost: Decimal,

    /// IANA timezone name used to derive valuation dates. `None` means
    /// the default (America/New_York).
    #[serde(default)]
    pub valuation_timezone: Option<String>,
}

fn default_settlement_symbols() -> HashSet<String> {
    let mut symbols = HashSet::new();
    symbols.insert(DEFAULT_SETTLEMENT_SYMBOL.to_string());
    symbols
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            settlement_symbols: default_settlement_symbols(),
            default_unit_cost: Decimal::ZERO,
            valuation_timezone: None,
        }
    }
}

impl EngineSettings {
    /// True if the symbol is configured as a settlement fund.
    pub fn is_settlement_symbol(&self, symbol: &str) -> bool {
        self.settlement_symbols.contains(symbol)
    }

    /// The configured valuation timezone, falling back to the default
    /// when unset or unparseable.
    pub fn valuation_tz(&self) -> Tz {
        self.valuation_timezone
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(DEFAULT_VALUATION_TZ)
    }
}
