//! Quote domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A daily close price for a symbol. Closes are actual trading prices,
/// not retroactively split-adjusted; the snapshot calculator reverses
/// same-day splits itself when valuing pre-split positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub quote_date: NaiveDate,
    pub close: Decimal,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, quote_date: NaiveDate, close: Decimal) -> Self {
        Quote {
            symbol: symbol.into(),
            quote_date,
            close,
        }
    }
}
