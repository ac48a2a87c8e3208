//! Transaction CRUD service.
//!
//! Every mutation of the transaction log invalidates the portfolio's
//! entire snapshot history (cumulative TWR is chain-dependent on every
//! prior day), so create/update/delete each trigger a full snapshot
//! rebuild for the affected portfolio.

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::{NewTransaction, Transaction, TransactionRepositoryTrait, TransactionUpdate};
use crate::errors::Result;
use crate::portfolio::snapshot::SnapshotServiceTrait;

#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    /// Create a transaction, then rebuild the portfolio's snapshots.
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction>;

    /// Update a transaction, then rebuild the portfolio's snapshots.
    async fn update(&self, update: TransactionUpdate) -> Result<Transaction>;

    /// Delete a transaction, then rebuild the portfolio's snapshots.
    async fn delete(&self, transaction_id: &str) -> Result<Transaction>;

    /// Bulk-import transactions (a single rebuild at the end).
    async fn import(&self, new_transactions: Vec<NewTransaction>) -> Result<Vec<Transaction>>;

    fn get_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>>;
}

#[derive(Clone)]
pub struct TransactionService {
    repository: Arc<dyn TransactionRepositoryTrait>,
    snapshot_service: Arc<dyn SnapshotServiceTrait>,
}

impl TransactionService {
    pub fn new(
        repository: Arc<dyn TransactionRepositoryTrait>,
        snapshot_service: Arc<dyn SnapshotServiceTrait>,
    ) -> Self {
        Self {
            repository,
            snapshot_service,
        }
    }

    async fn rebuild(&self, portfolio_id: &str) -> Result<()> {
        debug!(
            "Transaction mutation for portfolio {}; triggering snapshot rebuild",
            portfolio_id
        );
        self.snapshot_service.rebuild(portfolio_id).await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        let transaction = self.repository.create(new_transaction).await?;
        self.rebuild(&transaction.portfolio_id).await?;
        Ok(transaction)
    }

    async fn update(&self, update: TransactionUpdate) -> Result<Transaction> {
        let transaction = self.repository.update(update).await?;
        self.rebuild(&transaction.portfolio_id).await?;
        Ok(transaction)
    }

    async fn delete(&self, transaction_id: &str) -> Result<Transaction> {
        let transaction = self.repository.delete(transaction_id).await?;
        self.rebuild(&transaction.portfolio_id).await?;
        Ok(transaction)
    }

    async fn import(&self, new_transactions: Vec<NewTransaction>) -> Result<Vec<Transaction>> {
        let mut created = Vec::with_capacity(new_transactions.len());
        let mut touched_portfolios: Vec<String> = Vec::new();
        for new_transaction in new_transactions {
            let transaction = self.repository.create(new_transaction).await?;
            if !touched_portfolios.contains(&transaction.portfolio_id) {
                touched_portfolios.push(transaction.portfolio_id.clone());
            }
            created.push(transaction);
        }
        for portfolio_id in &touched_portfolios {
            self.rebuild(portfolio_id).await?;
        }
        Ok(created)
    }

    fn get_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        self.repository.get_for_portfolio(portfolio_id)
    }
}
