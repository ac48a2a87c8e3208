//! Pure aggregation over member snapshot series.
//!
//! An aggregate is the datewise sum of its members' snapshots with the
//! time-weighted return re-chained from the summed series. Averaging
//! member TWRs would be wrong whenever member sizes differ, so the
//! chain is always recomputed from summed values and summed flows.

use chrono::{NaiveDate, Utc};
use log::warn;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::AggregationError;
use crate::portfolio::snapshot::DailySnapshot;
use crate::utils::time_utils::get_days_between;

/// Sums one day's member snapshots into an aggregate snapshot.
///
/// Any member without a snapshot for the date is fatal; substituting
/// zero would silently understate the aggregate. The returned
/// `cumulative_twr` is zero: a chained return only exists on a series,
/// see [`build_aggregate_series`].
pub fn aggregate_on_date(
    aggregate_id: &str,
    date: NaiveDate,
    members: &[(&str, Option<&DailySnapshot>)],
) -> Result<DailySnapshot, AggregationError> {
    if members.is_empty() {
        return Err(AggregationError::NoMembers(aggregate_id.to_string()));
    }

    let mut total_value = Decimal::ZERO;
    let mut cash_balance = Decimal::ZERO;
    let mut net_deposits = Decimal::ZERO;
    let mut external_cash_flow = Decimal::ZERO;
    let mut investment_income = Decimal::ZERO;

    for (member_id, snapshot) in members {
        let snapshot = snapshot.ok_or_else(|| AggregationError::MissingMemberSnapshot {
            portfolio_id: member_id.to_string(),
            date,
        })?;
        total_value += snapshot.total_value;
        cash_balance += snapshot.cash_balance;
        net_deposits += snapshot.net_deposits;
        external_cash_flow += snapshot.external_cash_flow;
        investment_income += snapshot.investment_income;
    }

    Ok(DailySnapshot {
        id: DailySnapshot::make_id(aggregate_id, date),
        portfolio_id: aggregate_id.to_string(),
        snapshot_date: date,
        total_value,
        cash_balance,
        net_deposits,
        external_cash_flow,
        investment_income,
        cumulative_twr: Decimal::ZERO,
        calculated_at: Utc::now().naive_utc(),
    })
}

/// Builds the aggregate's snapshot series over the range covered by
/// every member: `[max(member first dates), min(member last dates)]`.
/// Within that range a missing member snapshot is fatal.
pub fn build_aggregate_series(
    aggregate_id: &str,
    member_series: &HashMap<String, Vec<DailySnapshot>>,
) -> Result<Vec<DailySnapshot>, AggregationError> {
    if member_series.is_empty() {
        return Err(AggregationError::NoMembers(aggregate_id.to_string()));
    }

    let mut start: Option<NaiveDate> = None;
    let mut end: Option<NaiveDate> = None;
    for series in member_series.values() {
        let (first, last) = match (series.first(), series.last()) {
            (Some(first), Some(last)) => (first.snapshot_date, last.snapshot_date),
            _ => return Err(AggregationError::NoCoveredRange(aggregate_id.to_string())),
        };
        start = Some(start.map_or(first, |s| s.max(first)));
        end = Some(end.map_or(last, |e| e.min(last)));
    }
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if start <= end => (start, end),
        _ => return Err(AggregationError::NoCoveredRange(aggregate_id.to_string())),
    };

    let indexed: Vec<(&str, HashMap<NaiveDate, &DailySnapshot>)> = member_series
        .iter()
        .map(|(member_id, series)| {
            let by_date = series
                .iter()
                .map(|snapshot| (snapshot.snapshot_date, snapshot))
                .collect();
            (member_id.as_str(), by_date)
        })
        .collect();

    let mut aggregated = Vec::new();
    let mut prev_total_value: Option<Decimal> = None;
    let mut cumulative_twr = Decimal::ZERO;

    for date in get_days_between(start, end) {
        let members: Vec<(&str, Option<&DailySnapshot>)> = indexed
            .iter()
            .map(|(member_id, by_date)| (*member_id, by_date.get(&date).copied()))
            .collect();
        let mut snapshot = aggregate_on_date(aggregate_id, date, &members)?;

        let daily_return = match prev_total_value {
            Some(prev) if prev > Decimal::ZERO => {
                let denominator = prev + snapshot.external_cash_flow;
                if denominator <= Decimal::ZERO {
                    warn!(
                        "Degenerate return denominator {} for aggregate {} on {}",
                        denominator, aggregate_id, date
                    );
                    Decimal::ZERO
                } else {
                    snapshot.total_value / denominator - Decimal::ONE
                }
            }
            _ => Decimal::ZERO,
        };
        cumulative_twr =
            (Decimal::ONE + cumulative_twr) * (Decimal::ONE + daily_return) - Decimal::ONE;
        snapshot.cumulative_twr = cumulative_twr;

        prev_total_value = Some(snapshot.total_value);
        aggregated.push(snapshot);
    }

    Ok(aggregated)
}
