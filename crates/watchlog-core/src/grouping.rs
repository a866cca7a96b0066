//! Year → month grouping of watch records.
//!
//! One ordering rule drives everything here: [`WatchRecord::cmp_newest_first`],
//! ties kept in store order. The record store lists with the same rule, so on
//! a store listing the latest record is simply the first one. Buckets are
//! filled in that ordering, so the "latest" flag can never disagree with what
//! the groups display.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use watchlog_models::WatchRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Most recent year first
    #[default]
    Descending,
    /// Archive view, oldest year first
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup {
    pub month: u32,
    /// Effective date descending
    pub records: Vec<WatchRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearGroup {
    pub year: i32,
    pub months: Vec<MonthGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedHistory {
    pub years: Vec<YearGroup>,
    pub latest_id: Option<String>,
}

impl GroupedHistory {
    /// All records in display order
    pub fn flatten(&self) -> Vec<&WatchRecord> {
        self.years
            .iter()
            .flat_map(|y| y.months.iter())
            .flat_map(|m| m.records.iter())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.years
            .iter()
            .flat_map(|y| y.months.iter())
            .map(|m| m.records.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Records by effective date descending; equal dates keep their store order
pub fn newest_first(records: &[WatchRecord], now: DateTime<Utc>) -> Vec<&WatchRecord> {
    let mut ordered: Vec<&WatchRecord> = records.iter().collect();
    // sort_by is stable
    ordered.sort_by(|a, b| a.cmp_newest_first(b, now));
    ordered
}

pub fn latest_record(records: &[WatchRecord], now: DateTime<Utc>) -> Option<&WatchRecord> {
    newest_first(records, now).into_iter().next()
}

/// Bucket records by the year and month of their effective date
///
/// `direction` orders years and the months inside each year. Records inside a
/// month are always newest first.
pub fn group_by_year_month(
    records: &[WatchRecord],
    direction: SortDirection,
    now: DateTime<Utc>,
) -> GroupedHistory {
    let ordered = newest_first(records, now);
    let latest_id = ordered.first().map(|r| r.id.clone());

    let mut buckets: BTreeMap<i32, BTreeMap<u32, Vec<WatchRecord>>> = BTreeMap::new();
    for record in ordered {
        let date = record.effective_date(now);
        buckets
            .entry(date.year())
            .or_default()
            .entry(date.month())
            .or_default()
            .push(record.clone());
    }

    let mut years: Vec<YearGroup> = buckets
        .into_iter()
        .map(|(year, months)| {
            let mut months: Vec<MonthGroup> = months
                .into_iter()
                .map(|(month, records)| MonthGroup { month, records })
                .collect();
            if direction == SortDirection::Descending {
                months.reverse();
            }
            YearGroup { year, months }
        })
        .collect();

    if direction == SortDirection::Descending {
        years.reverse();
    }

    GroupedHistory { years, latest_id }
}
