use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use super::{
    NewTransaction, Transaction, TransactionRepositoryTrait, TransactionService,
    TransactionServiceTrait, TransactionUpdate,
};
use crate::errors::{Error, Result};
use crate::portfolio::snapshot::{DailySnapshot, RebuildReport, SnapshotServiceTrait};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_tx(portfolio_id: &str, trade_date: NaiveDate) -> NewTransaction {
    NewTransaction {
        id: None,
        portfolio_id: portfolio_id.to_string(),
        trade_date,
        settlement_date: None,
        transaction_type: "SWEEP_IN".to_string(),
        symbol: None,
        quantity: None,
        unit_price: None,
        amount: Some(dec!(100)),
        fee: None,
        split_ratio: None,
        broker: None,
        description: None,
        source_file: None,
        metadata: None,
    }
}

#[derive(Default)]
struct MockTransactionRepository {
    transactions: RwLock<Vec<Transaction>>,
    next_sequence: AtomicI64,
}

#[async_trait]
impl TransactionRepositoryTrait for MockTransactionRepository {
    async fn create(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let transaction = new_transaction.into_transaction(sequence);
        self.transactions.write().unwrap().push(transaction.clone());
        Ok(transaction)
    }

    async fn update(&self, update: TransactionUpdate) -> Result<Transaction> {
        let mut transactions = self.transactions.write().unwrap();
        let transaction = transactions
            .iter_mut()
            .find(|tx| tx.id == update.id)
            .ok_or_else(|| Error::Repository(format!("transaction {} not found", update.id)))?;
        if let Some(trade_date) = update.trade_date {
            transaction.trade_date = trade_date;
        }
        if let Some(transaction_type) = update.transaction_type {
            transaction.transaction_type = transaction_type;
        }
        if let Some(amount) = update.amount {
            transaction.amount = amount;
        }
        transaction.updated_at = Utc::now().naive_utc();
        Ok(transaction.clone())
    }

    async fn delete(&self, transaction_id: &str) -> Result<Transaction> {
        let mut transactions = self.transactions.write().unwrap();
        let index = transactions
            .iter()
            .position(|tx| tx.id == transaction_id)
            .ok_or_else(|| {
                Error::Repository(format!("transaction {} not found", transaction_id))
            })?;
        Ok(transactions.remove(index))
    }

    fn get_by_id(&self, transaction_id: &str) -> Result<Transaction> {
        self.transactions
            .read()
            .unwrap()
            .iter()
            .find(|tx| tx.id == transaction_id)
            .cloned()
            .ok_or_else(|| Error::Repository(format!("transaction {} not found", transaction_id)))
    }

    fn get_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .read()
            .unwrap()
            .iter()
            .filter(|tx| tx.portfolio_id == portfolio_id)
            .cloned()
            .collect();
        transactions.sort_by_key(|tx| tx.order_key());
        Ok(transactions)
    }

    fn get_earliest_trade_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .iter()
            .filter(|tx| tx.portfolio_id == portfolio_id)
            .map(|tx| tx.trade_date)
            .min())
    }
}

#[derive(Default)]
struct MockSnapshotService {
    rebuild_counts: RwLock<HashMap<String, usize>>,
}

impl MockSnapshotService {
    fn rebuilds_for(&self, portfolio_id: &str) -> usize {
        self.rebuild_counts
            .read()
            .unwrap()
            .get(portfolio_id)
            .copied()
            .unwrap_or(0)
    }

    fn empty_report(portfolio_id: &str) -> RebuildReport {
        RebuildReport {
            portfolio_id: portfolio_id.to_string(),
            days_calculated: 0,
            first_date: None,
            last_date: None,
            coverage_gaps: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[async_trait]
impl SnapshotServiceTrait for MockSnapshotService {
    async fn rebuild(&self, portfolio_id: &str) -> Result<RebuildReport> {
        *self
            .rebuild_counts
            .write()
            .unwrap()
            .entry(portfolio_id.to_string())
            .or_default() += 1;
        Ok(Self::empty_report(portfolio_id))
    }

    async fn rebuild_as_of(
        &self,
        portfolio_id: &str,
        _end_date: NaiveDate,
    ) -> Result<RebuildReport> {
        self.rebuild(portfolio_id).await
    }

    async fn rebuild_many(&self, portfolio_ids: Vec<String>) -> Result<Vec<RebuildReport>> {
        let mut reports = Vec::new();
        for portfolio_id in portfolio_ids {
            reports.push(self.rebuild(&portfolio_id).await?);
        }
        Ok(reports)
    }

    fn get_snapshots(
        &self,
        _portfolio_id: &str,
        _start: Option<NaiveDate>,
        _end: Option<NaiveDate>,
    ) -> Result<Vec<DailySnapshot>> {
        Ok(Vec::new())
    }

    fn get_latest_snapshot(&self, _portfolio_id: &str) -> Result<Option<DailySnapshot>> {
        Ok(None)
    }
}

fn service() -> (TransactionService, Arc<MockSnapshotService>) {
    let snapshot_service = Arc::new(MockSnapshotService::default());
    let service = TransactionService::new(
        Arc::new(MockTransactionRepository::default()),
        snapshot_service.clone(),
    );
    (service, snapshot_service)
}

#[tokio::test]
async fn test_create_assigns_sequence_and_rebuilds() {
    let (service, snapshots) = service();

    let first = service.create(new_tx("port-1", date(2024, 1, 2))).await.unwrap();
    let second = service.create(new_tx("port-1", date(2024, 1, 2))).await.unwrap();

    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);
    assert_eq!(snapshots.rebuilds_for("port-1"), 2);
}

#[tokio::test]
async fn test_update_rebuilds_affected_portfolio() {
    let (service, snapshots) = service();
    let created = service.create(new_tx("port-1", date(2024, 1, 2))).await.unwrap();

    let update = TransactionUpdate {
        id: created.id.clone(),
        amount: Some(Some(dec!(250))),
        ..Default::default()
    };
    let updated = service.update(update).await.unwrap();

    assert_eq!(updated.amount, Some(dec!(250)));
    assert_eq!(updated.sequence, created.sequence);
    assert_eq!(snapshots.rebuilds_for("port-1"), 2);
}

#[tokio::test]
async fn test_delete_rebuilds_affected_portfolio() {
    let (service, snapshots) = service();
    let created = service.create(new_tx("port-1", date(2024, 1, 2))).await.unwrap();

    let deleted = service.delete(&created.id).await.unwrap();
    assert_eq!(deleted.id, created.id);
    assert!(service.get_for_portfolio("port-1").unwrap().is_empty());
    assert_eq!(snapshots.rebuilds_for("port-1"), 2);
}

#[tokio::test]
async fn test_import_rebuilds_each_touched_portfolio_once() {
    let (service, snapshots) = service();

    let created = service
        .import(vec![
            new_tx("port-a", date(2024, 1, 2)),
            new_tx("port-a", date(2024, 1, 3)),
            new_tx("port-b", date(2024, 1, 2)),
        ])
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert_eq!(snapshots.rebuilds_for("port-a"), 1);
    assert_eq!(snapshots.rebuilds_for("port-b"), 1);

    let sequences: Vec<i64> = created.iter().map(|tx| tx.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_get_for_portfolio_returns_replay_order() {
    let (service, _) = service();
    service.create(new_tx("port-1", date(2024, 1, 3))).await.unwrap();
    service.create(new_tx("port-1", date(2024, 1, 1))).await.unwrap();

    let transactions = service.get_for_portfolio("port-1").unwrap();
    assert_eq!(transactions[0].trade_date, date(2024, 1, 1));
    assert_eq!(transactions[1].trade_date, date(2024, 1, 3));
}
