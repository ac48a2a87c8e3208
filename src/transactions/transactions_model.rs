//! Transaction domain models.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical transaction types the engine maps to a cash or position
/// effect. The set is deliberately open-ended: a type outside this list
/// is replayed with $0 effect and retained for audit, never dropped and
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Interest,
    Drip,
    SweepIn,
    SweepOut,
    TransferIn,
    TransferOut,
    Fee,
    Split,
    /// Unmapped type: no cash or position effect, retained for audit.
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Dividend => "DIVIDEND",
            TransactionType::Interest => "INTEREST",
            TransactionType::Drip => "DRIP",
            TransactionType::SweepIn => "SWEEP_IN",
            TransactionType::SweepOut => "SWEEP_OUT",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::Fee => "FEE",
            TransactionType::Split => "SPLIT",
            TransactionType::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    /// Never fails: unrecognized strings map to `Unknown` so that new
    /// broker transaction types flow through the ledger with $0 effect
    /// instead of breaking a rebuild.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BUY" => TransactionType::Buy,
            "SELL" => TransactionType::Sell,
            "DIVIDEND" => TransactionType::Dividend,
            "INTEREST" => TransactionType::Interest,
            "DRIP" => TransactionType::Drip,
            "SWEEP_IN" => TransactionType::SweepIn,
            "SWEEP_OUT" => TransactionType::SweepOut,
            "TRANSFER_IN" => TransactionType::TransferIn,
            "TRANSFER_OUT" => TransactionType::TransferOut,
            "FEE" => TransactionType::Fee,
            "SPLIT" => TransactionType::Split,
            _ => TransactionType::Unknown,
        })
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ledger record. Immutable once created except through the
/// explicit CRUD operations of the collaborator layer; the lot engine
/// only ever reads transactions in `(trade_date, sequence)` order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub portfolio_id: String,

    /// Insertion order within the portfolio. Part of the data model: the
    /// replay ordering key is `(trade_date, sequence)` and insertion
    /// order is not recoverable from anything else, so import order must
    /// be preserved here.
    pub sequence: i64,

    pub trade_date: NaiveDate,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<NaiveDate>,

    /// Canonical type string (see [`TransactionType`]). Stored as text so
    /// unmapped broker types survive round-trips intact.
    pub transaction_type: String,

    /// Nullable for pure cash movements (sweeps, cash transfers, fees).
    pub symbol: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub split_ratio: Option<Decimal>,

    pub broker: Option<String>,
    pub description: Option<String>,
    pub source_file: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// The parsed canonical type; unrecognized strings become `Unknown`.
    pub fn tx_type(&self) -> TransactionType {
        TransactionType::from_str(&self.transaction_type).unwrap_or(TransactionType::Unknown)
    }

    pub fn qty(&self) -> Decimal {
        self.quantity.unwrap_or(Decimal::ZERO)
    }

    pub fn price(&self) -> Decimal {
        self.unit_price.unwrap_or(Decimal::ZERO)
    }

    pub fn amt(&self) -> Decimal {
        self.amount.unwrap_or(Decimal::ZERO)
    }

    pub fn fee_amt(&self) -> Decimal {
        self.fee.unwrap_or(Decimal::ZERO)
    }

    /// The replay ordering key.
    pub fn order_key(&self) -> (NaiveDate, i64) {
        (self.trade_date, self.sequence)
    }
}

/// Payload for creating a transaction. The repository assigns the
/// `sequence` at insert time and never recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub id: Option<String>,
    pub portfolio_id: String,
    pub trade_date: NaiveDate,
    #[serde(default)]
    pub settlement_date: Option<NaiveDate>,
    pub transaction_type: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub split_ratio: Option<Decimal>,
    #[serde(default)]
    pub broker: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl NewTransaction {
    /// Materialize with an assigned sequence number.
    pub fn into_transaction(self, sequence: i64) -> Transaction {
        let now = Utc::now().naive_utc();
        Transaction {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            portfolio_id: self.portfolio_id,
            sequence,
            trade_date: self.trade_date,
            settlement_date: self.settlement_date,
            transaction_type: self.transaction_type,
            symbol: self.symbol,
            quantity: self.quantity,
            unit_price: self.unit_price,
            amount: self.amount,
            fee: self.fee,
            split_ratio: self.split_ratio,
            broker: self.broker,
            description: self.description,
            source_file: self.source_file,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field-level update for an existing transaction. `None` leaves the
/// stored value untouched; `sequence` is intentionally not updatable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub id: String,
    #[serde(default)]
    pub trade_date: Option<NaiveDate>,
    #[serde(default)]
    pub settlement_date: Option<NaiveDate>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub symbol: Option<Option<String>>,
    #[serde(default)]
    pub quantity: Option<Option<Decimal>>,
    #[serde(default)]
    pub unit_price: Option<Option<Decimal>>,
    #[serde(default)]
    pub amount: Option<Option<Decimal>>,
    #[serde(default)]
    pub fee: Option<Option<Decimal>>,
    #[serde(default)]
    pub split_ratio: Option<Option<Decimal>>,
    #[serde(default)]
    pub description: Option<Option<String>>,
}
