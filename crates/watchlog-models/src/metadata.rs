use serde::{Deserialize, Serialize};

/// Production country of a title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166-1 code (TMDB calls this `iso_3166_1`)
    #[serde(default, alias = "iso_3166_1", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
}

impl Country {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            name: name.to_string(),
        }
    }
}

/// Country list of a cached entry
///
/// Old caches stored countries as bare names. Those are decoded into `Legacy`
/// once when the cache is read, and everything written back is tagged, so the
/// rest of the code matches on the variant instead of inspecting shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Countries {
    Resolved(Vec<Country>),
    Legacy(Vec<String>),
}

impl Default for Countries {
    fn default() -> Self {
        Countries::Resolved(Vec::new())
    }
}

impl Countries {
    /// True when the list carries legacy name-only data worth refreshing
    pub fn is_legacy(&self) -> bool {
        matches!(self, Countries::Legacy(names) if !names.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Countries::Resolved(list) => list.is_empty(),
            Countries::Legacy(names) => names.is_empty(),
        }
    }

    /// Countries in listed order; legacy entries come back without a code
    pub fn to_vec(&self) -> Vec<Country> {
        match self {
            Countries::Resolved(list) => list.clone(),
            Countries::Legacy(names) => names
                .iter()
                .map(|name| Country { code: None, name: name.clone() })
                .collect(),
        }
    }
}

/// Cached enrichment for one external id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "StoredEntry")]
pub struct MetadataEntry {
    /// First genre is the primary one
    pub genres: Vec<String>,
    pub countries: Countries,
}

impl MetadataEntry {
    pub fn new(genres: Vec<String>, countries: Vec<Country>) -> Self {
        Self {
            genres,
            countries: Countries::Resolved(countries),
        }
    }

    pub fn primary_genre(&self) -> Option<&str> {
        self.genres.first().map(String::as_str)
    }
}

/// Any shape an entry has ever been persisted in
#[derive(Deserialize)]
struct StoredEntry {
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    countries: Option<StoredCountries>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCountries {
    Tagged(Countries),
    Plain(Vec<PlainCountry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlainCountry {
    Object(Country),
    Name(String),
}

impl From<Vec<PlainCountry>> for Countries {
    fn from(plain: Vec<PlainCountry>) -> Self {
        // The first element decides: a leading bare name marks the whole list as legacy
        let legacy = matches!(plain.first(), Some(PlainCountry::Name(_)));
        if legacy {
            Countries::Legacy(
                plain
                    .into_iter()
                    .map(|c| match c {
                        PlainCountry::Name(name) => name,
                        PlainCountry::Object(country) => country.name,
                    })
                    .collect(),
            )
        } else {
            Countries::Resolved(
                plain
                    .into_iter()
                    .map(|c| match c {
                        PlainCountry::Object(country) => country,
                        PlainCountry::Name(name) => Country { code: None, name },
                    })
                    .collect(),
            )
        }
    }
}

impl From<StoredEntry> for MetadataEntry {
    fn from(stored: StoredEntry) -> Self {
        let countries = match stored.countries {
            Some(StoredCountries::Tagged(countries)) => countries,
            Some(StoredCountries::Plain(plain)) => plain.into(),
            None => Countries::default(),
        };
        Self {
            genres: stored.genres,
            countries,
        }
    }
}
