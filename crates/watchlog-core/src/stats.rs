//! Statistics rollups over the watch history.
//!
//! Every function here is a pure function of its inputs: the records and
//! whatever the metadata lookup holds at call time. A rollup computed while the
//! cache is still filling just reflects fewer entries.

use crate::grouping::SortDirection;
use crate::metadata_cache::MetadataLookup;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use watchlog_config::StatsConfig;
use watchlog_models::{Country, Person, WatchRecord};

pub const UNKNOWN_COUNTRY_NAME: &str = "Unknown";
pub const UNKNOWN_COUNTRY_CODE: &str = "XX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

impl NamedCount {
    fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub name: String,
    pub count: usize,
    pub code: Option<String>,
}

impl CountryCount {
    /// Regional-indicator flag for the ISO code, empty without a real code
    pub fn flag(&self) -> String {
        match self.code.as_deref() {
            Some(code) if code.len() == 2 && code != UNKNOWN_COUNTRY_CODE => code
                .to_ascii_uppercase()
                .chars()
                .filter(|c| c.is_ascii_uppercase())
                .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
                .collect(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Restrict every rollup except turns to one person
    pub person: Option<Person>,
    pub decade_order: SortDirection,
    /// `None` keeps the full list
    pub genre_top_n: Option<usize>,
    pub country_top_n: Option<usize>,
    pub home_country_code: String,
    pub home_country_name: String,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self::from_config(&StatsConfig::default())
    }
}

impl StatsOptions {
    pub fn from_config(config: &StatsConfig) -> Self {
        Self {
            person: None,
            decade_order: SortDirection::Ascending,
            genre_top_n: Some(config.genre_top_n),
            country_top_n: Some(config.country_top_n),
            home_country_code: config.home_country_code.clone(),
            home_country_name: config.home_country_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub person: Option<Person>,
    /// Records left after the person filter
    pub total: usize,
    pub turns_per_person: Vec<NamedCount>,
    pub monthly_activity: Vec<NamedCount>,
    pub pace: f64,
    pub decades: Vec<NamedCount>,
    pub genres: Vec<NamedCount>,
    pub countries: Vec<CountryCount>,
}

/// Turns over the whole history. With a person filter only that person's
/// total is reported.
pub fn turns_per_person(all_records: &[WatchRecord], person: Option<Person>) -> Vec<NamedCount> {
    let count_for = |p: Person| all_records.iter().filter(|r| r.person == p).count();
    match person {
        Some(p) => vec![NamedCount::new(p.name(), count_for(p))],
        None => Person::ALL
            .iter()
            .map(|p| NamedCount::new(p.name(), count_for(*p)))
            .collect(),
    }
}

/// Records per calendar month as `YYYY-MM`, oldest first
pub fn monthly_activity(records: &[&WatchRecord]) -> Vec<NamedCount> {
    let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for date in records.iter().filter_map(|r| r.resolvable_date()) {
        *months.entry((date.year(), date.month())).or_insert(0) += 1;
    }
    months
        .into_iter()
        .map(|((year, month), count)| NamedCount::new(format!("{:04}-{:02}", year, month), count))
        .collect()
}

/// Average records per month from the first dated record up to `now`
///
/// Rounded to one decimal. Only dated records count, and the span runs to
/// `now` rather than to the last record, so pace decays while nothing is watched.
pub fn pace(records: &[&WatchRecord], now: DateTime<Utc>) -> f64 {
    let dates: Vec<_> = records.iter().filter_map(|r| r.resolvable_date()).collect();
    let Some(start) = dates.iter().min() else {
        return 0.0;
    };

    let end = now.date_naive();
    let months_spanned = (end.year() - start.year()) as i64 * 12
        + (end.month() as i64 - start.month() as i64)
        + 1;
    let raw = dates.len() as f64 / months_spanned.max(1) as f64;
    (raw * 10.0).round() / 10.0
}

/// Release decades labelled `1990s`; records without a release year are left out
pub fn decade_distribution(records: &[&WatchRecord], order: SortDirection) -> Vec<NamedCount> {
    let mut decades: BTreeMap<i32, usize> = BTreeMap::new();
    for year in records.iter().filter_map(|r| r.known_release_year()) {
        *decades.entry(year.div_euclid(10) * 10).or_insert(0) += 1;
    }

    let mut result: Vec<NamedCount> = decades
        .into_iter()
        .map(|(decade, count)| NamedCount::new(format!("{}s", decade), count))
        .collect();
    if order == SortDirection::Descending {
        result.reverse();
    }
    result
}

/// Primary genre counts, most common first (ties alphabetical)
///
/// Each record with a cached entry counts once under its first genre;
/// rewatches count every time.
pub fn genre_distribution<L>(
    records: &[&WatchRecord],
    lookup: &L,
    top_n: Option<usize>,
) -> Vec<NamedCount>
where
    L: MetadataLookup + ?Sized,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let primary = record
            .external_id
            .and_then(|id| lookup.lookup(id))
            .and_then(|entry| entry.primary_genre());
        if let Some(genre) = primary {
            *counts.entry(genre).or_insert(0) += 1;
        }
    }

    let mut result: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, count)| NamedCount::new(name, count))
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    if let Some(n) = top_n {
        result.truncate(n);
    }
    result
}

fn is_home_country(country: &Country, options: &StatsOptions) -> bool {
    (!options.home_country_name.is_empty() && country.name.eq_ignore_ascii_case(&options.home_country_name))
        || country
            .code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(&options.home_country_code))
}

fn home_country(country: &Country, options: &StatsOptions) -> (String, Option<String>) {
    let name = if options.home_country_name.trim().is_empty() {
        country.name.clone()
    } else {
        options.home_country_name.clone()
    };
    let code = if options.home_country_code.trim().is_empty() {
        country.code.clone()
    } else {
        Some(options.home_country_code.to_uppercase())
    };
    (name, code)
}

fn display_country_name(name: &str) -> &str {
    match name {
        "United States of America" => "USA",
        other => other,
    }
}

/// One country per record, most common first (ties by name)
///
/// A co-production involving the home country counts under it, else the first
/// listed country counts. Cached entries without countries count as unknown.
pub fn country_distribution<L>(
    records: &[&WatchRecord],
    lookup: &L,
    options: &StatsOptions,
) -> Vec<CountryCount>
where
    L: MetadataLookup + ?Sized,
{
    // Aggregation key is the code, else the name
    let mut counts: HashMap<String, CountryCount> = HashMap::new();

    for record in records {
        let Some(entry) = record.external_id.and_then(|id| lookup.lookup(id)) else {
            continue;
        };

        let countries = entry.countries.to_vec();
        let chosen = countries
            .iter()
            .find(|c| is_home_country(c, options))
            .or_else(|| countries.first());

        let (name, code) = match chosen {
            // Legacy name-only entries land in the same bucket as resolved ones
            Some(country) if is_home_country(country, options) => home_country(country, options),
            Some(country) => (country.name.clone(), country.code.clone()),
            None => (
                UNKNOWN_COUNTRY_NAME.to_string(),
                Some(UNKNOWN_COUNTRY_CODE.to_string()),
            ),
        };

        let key = code.clone().unwrap_or_else(|| name.clone());
        counts
            .entry(key)
            .or_insert_with(|| CountryCount {
                name: display_country_name(&name).to_string(),
                count: 0,
                code,
            })
            .count += 1;
    }

    let mut result: Vec<CountryCount> = counts.into_values().collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    if let Some(n) = options.country_top_n {
        result.truncate(n);
    }
    result
}

/// All rollups for the (optionally person-filtered) history
pub fn compute_stats<L>(
    all_records: &[WatchRecord],
    lookup: &L,
    options: &StatsOptions,
    now: DateTime<Utc>,
) -> StatsReport
where
    L: MetadataLookup + ?Sized,
{
    let filtered: Vec<&WatchRecord> = all_records
        .iter()
        .filter(|r| options.person.map_or(true, |p| r.person == p))
        .collect();

    StatsReport {
        person: options.person,
        total: filtered.len(),
        turns_per_person: turns_per_person(all_records, options.person),
        monthly_activity: monthly_activity(&filtered),
        pace: pace(&filtered, now),
        decades: decade_distribution(&filtered, options.decade_order),
        genres: genre_distribution(&filtered, lookup, options.genre_top_n),
        countries: country_distribution(&filtered, lookup, options),
    }
}
