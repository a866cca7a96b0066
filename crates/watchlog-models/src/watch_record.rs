use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use crate::ExternalId;

/// The club member whose turn it was to choose the movie
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Person {
    Tomi,
    Mikkis,
    Aino,
    Mari,
}

impl Person {
    /// All members in turn order
    pub const ALL: [Person; 4] = [Person::Tomi, Person::Mikkis, Person::Aino, Person::Mari];

    pub fn name(&self) -> &'static str {
        match self {
            Person::Tomi => "Tomi",
            Person::Mikkis => "Mikkis",
            Person::Aino => "Aino",
            Person::Mari => "Mari",
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPerson(pub String);

impl fmt::Display for UnknownPerson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown person '{}'", self.0)
    }
}

impl std::error::Error for UnknownPerson {}

impl FromStr for Person {
    type Err = UnknownPerson;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Person::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPerson(wanted.to_string()))
    }
}

/// One logged viewing event
///
/// Records are read-only to the core. The date fields are all optional:
/// imported and hand-entered data is frequently incomplete, and every consumer
/// goes through [`WatchRecord::effective_date`] or [`WatchRecord::resolvable_date`]
/// instead of reading `watched_at` directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<NaiveDate>,
    /// When the record itself was created (fallback for a missing watch date)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub person: Person,
    /// Not every record is enriched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
}

impl WatchRecord {
    /// The watch date, else the creation date. `None` when neither is known.
    pub fn resolvable_date(&self) -> Option<NaiveDate> {
        self.watched_at
            .or_else(|| self.created_at.map(|ts| ts.date_naive()))
    }

    /// Date used for grouping: falls back to `now` when nothing else is known
    pub fn effective_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.resolvable_date().unwrap_or_else(|| now.date_naive())
    }

    /// Newest-first ordering shared by the record store and the grouper
    ///
    /// Compares effective dates only, so equal dates report `Equal` and a
    /// stable sort keeps the caller's relative order.
    pub fn cmp_newest_first(&self, other: &Self, now: DateTime<Utc>) -> Ordering {
        other.effective_date(now).cmp(&self.effective_date(now))
    }

    /// Release year, treating the legacy `0` placeholder as unknown
    pub fn known_release_year(&self) -> Option<i32> {
        self.release_year.filter(|year| *year > 0)
    }
}
