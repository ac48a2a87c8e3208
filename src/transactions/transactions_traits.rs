//! Repository trait for the transaction store.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{NewTransaction, Transaction, TransactionUpdate};
use crate::errors::Result;

/// Repository trait for the append-ordered transaction log.
///
/// Reads must return transactions ordered by `(trade_date, sequence)`;
/// the sequence is assigned once at insert and preserved forever, since
/// replay determinism depends on it.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    async fn update(&self, update: TransactionUpdate) -> Result<Transaction>;

    async fn delete(&self, transaction_id: &str) -> Result<Transaction>;

    fn get_by_id(&self, transaction_id: &str) -> Result<Transaction>;

    /// All transactions for a portfolio in replay order.
    fn get_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>>;

    /// Earliest trade date for a portfolio, if it has any transactions.
    fn get_earliest_trade_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>>;
}
