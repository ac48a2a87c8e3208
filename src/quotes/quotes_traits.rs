//! Repository trait for the external price cache.

use chrono::NaiveDate;
use std::collections::HashSet;

use super::Quote;
use crate::errors::Result;

/// Read-only boundary to the price cache collaborator.
///
/// Lookups never fabricate data: a date with no stored close is simply
/// absent, and callers fall back to the most recent close at or before
/// the date they need. Prices are never taken from the future.
pub trait QuoteRepositoryTrait: Send + Sync {
    /// All stored closes for the given symbols within `[start, end]`.
    fn get_closes_in_range(
        &self,
        symbols: &HashSet<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>>;

    /// Most recent close at or before `date`, if any exists.
    fn get_latest_close_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Quote>>;

    /// The `(min_date, max_date)` range cached for a symbol, used by the
    /// price-fetching collaborator for high-water-mark incremental
    /// refresh. `None` when nothing is cached.
    fn get_cached_range(&self, symbol: &str) -> Result<Option<(NaiveDate, NaiveDate)>>;
}
