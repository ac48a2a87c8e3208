//! Repository and service traits for daily snapshots.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{DailySnapshot, RebuildReport};
use crate::errors::Result;

/// Persistence boundary for snapshot series.
///
/// `replace_all_for_portfolio` is the only write path used by rebuilds
/// and must be atomic: readers observe either the complete old series or
/// the complete new one, never a mix.
#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    fn get_snapshots_in_range(
        &self,
        portfolio_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailySnapshot>>;

    fn get_snapshot_on_date(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailySnapshot>>;

    fn get_latest_snapshot(&self, portfolio_id: &str) -> Result<Option<DailySnapshot>>;

    /// Atomically replaces the portfolio's entire stored series.
    async fn replace_all_for_portfolio(
        &self,
        portfolio_id: &str,
        snapshots: Vec<DailySnapshot>,
    ) -> Result<()>;

    async fn delete_all_for_portfolio(&self, portfolio_id: &str) -> Result<()>;
}

/// Snapshot orchestration: full rebuilds and series queries.
#[async_trait]
pub trait SnapshotServiceTrait: Send + Sync {
    /// Full rebuild from the first transaction date through today.
    async fn rebuild(&self, portfolio_id: &str) -> Result<RebuildReport>;

    /// Full rebuild through an explicit end date.
    async fn rebuild_as_of(&self, portfolio_id: &str, end_date: NaiveDate)
        -> Result<RebuildReport>;

    /// Rebuilds several portfolios concurrently; each rebuild is atomic
    /// on its own.
    async fn rebuild_many(&self, portfolio_ids: Vec<String>) -> Result<Vec<RebuildReport>>;

    fn get_snapshots(
        &self,
        portfolio_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DailySnapshot>>;

    fn get_latest_snapshot(&self, portfolio_id: &str) -> Result<Option<DailySnapshot>>;
}
