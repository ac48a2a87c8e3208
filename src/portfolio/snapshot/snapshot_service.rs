//! Snapshot orchestration service.
//!
//! Loads the ordered transaction log and pre-fetches every quote the
//! calculator could need, runs the pure calculator entirely in memory,
//! then atomically replaces the portfolio's stored series. A DashMap of
//! per-portfolio mutexes serializes concurrent rebuilds of the same
//! portfolio; different portfolios rebuild in parallel.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::snapshot_calculator::build_daily_snapshots;
use super::{DailySnapshot, RebuildReport, SnapshotRepositoryTrait, SnapshotServiceTrait};
use crate::errors::{Error, Result};
use crate::quotes::{Quote, QuoteRepositoryTrait};
use crate::settings::EngineSettings;
use crate::transactions::{Transaction, TransactionRepositoryTrait};
use crate::utils::time_utils::valuation_date_from_utc;

#[derive(Clone)]
pub struct SnapshotService {
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    quote_repository: Arc<dyn QuoteRepositoryTrait>,
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    settings: EngineSettings,
    rebuild_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SnapshotService {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        quote_repository: Arc<dyn QuoteRepositoryTrait>,
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            transaction_repository,
            quote_repository,
            snapshot_repository,
            settings,
            rebuild_locks: Arc::new(DashMap::new()),
        }
    }

    fn rebuild_lock(&self, portfolio_id: &str) -> Arc<Mutex<()>> {
        self.rebuild_locks
            .entry(portfolio_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Quotes for all symbols in the log over `[start, end]`, seeded with
    /// the latest close at or before `start` per symbol so carry-forward
    /// works from day one.
    fn fetch_quotes(
        &self,
        transactions: &[Transaction],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>> {
        let symbols: HashSet<String> = transactions
            .iter()
            .filter_map(|tx| tx.symbol.clone())
            .collect();
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let mut quotes = self
            .quote_repository
            .get_closes_in_range(&symbols, start, end)?;
        for symbol in &symbols {
            if let Some(seed) = self
                .quote_repository
                .get_latest_close_on_or_before(symbol, start)?
            {
                quotes.push(seed);
            }
        }
        Ok(quotes)
    }

    async fn rebuild_inner(&self, portfolio_id: &str, end_date: NaiveDate) -> Result<RebuildReport> {
        let lock = self.rebuild_lock(portfolio_id);
        let _guard = lock.lock().await;

        let transactions = self.transaction_repository.get_for_portfolio(portfolio_id)?;
        if transactions.is_empty() {
            debug!(
                "Portfolio {} has no transactions; clearing stored snapshots",
                portfolio_id
            );
            self.snapshot_repository
                .delete_all_for_portfolio(portfolio_id)
                .await?;
            return Ok(RebuildReport {
                portfolio_id: portfolio_id.to_string(),
                days_calculated: 0,
                first_date: None,
                last_date: None,
                coverage_gaps: Vec::new(),
                warnings: Vec::new(),
            });
        }

        let start_date = transactions
            .iter()
            .map(|tx| tx.trade_date)
            .min()
            .unwrap_or(end_date);
        let end_date = end_date.max(start_date);

        let quotes = self.fetch_quotes(&transactions, start_date, end_date)?;
        let output = build_daily_snapshots(
            portfolio_id,
            &transactions,
            &quotes,
            &self.settings,
            end_date,
        )
        .map_err(|err| {
            error!("Snapshot rebuild failed for portfolio {}: {}", portfolio_id, err);
            err
        })?;

        let report = RebuildReport {
            portfolio_id: portfolio_id.to_string(),
            days_calculated: output.snapshots.len(),
            first_date: output.snapshots.first().map(|s| s.snapshot_date),
            last_date: output.snapshots.last().map(|s| s.snapshot_date),
            coverage_gaps: output.coverage_gaps,
            warnings: output.warnings,
        };

        self.snapshot_repository
            .replace_all_for_portfolio(portfolio_id, output.snapshots)
            .await?;

        info!(
            "Rebuilt {} snapshot days for portfolio {} ({} coverage gaps, {} warnings)",
            report.days_calculated,
            portfolio_id,
            report.coverage_gaps.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl SnapshotServiceTrait for SnapshotService {
    async fn rebuild(&self, portfolio_id: &str) -> Result<RebuildReport> {
        let today = valuation_date_from_utc(Utc::now(), self.settings.valuation_tz());
        self.rebuild_inner(portfolio_id, today).await
    }

    async fn rebuild_as_of(
        &self,
        portfolio_id: &str,
        end_date: NaiveDate,
    ) -> Result<RebuildReport> {
        self.rebuild_inner(portfolio_id, end_date).await
    }

    async fn rebuild_many(&self, portfolio_ids: Vec<String>) -> Result<Vec<RebuildReport>> {
        let mut handles = Vec::with_capacity(portfolio_ids.len());
        for portfolio_id in portfolio_ids {
            let service = self.clone();
            handles.push(tokio::spawn(async move {
                service.rebuild(&portfolio_id).await
            }));
        }

        let joined = futures::future::try_join_all(handles)
            .await
            .map_err(|err| Error::Unexpected(format!("Rebuild task panicked: {}", err)))?;
        joined.into_iter().collect()
    }

    fn get_snapshots(
        &self,
        portfolio_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailySnapshot>> {
        self.snapshot_repository
            .get_snapshots_in_range(portfolio_id, start, end)
    }

    fn get_latest_snapshot(&self, portfolio_id: &str) -> Result<Option<DailySnapshot>> {
        self.snapshot_repository.get_latest_snapshot(portfolio_id)
    }
}
