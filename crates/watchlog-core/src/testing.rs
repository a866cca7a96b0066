//! Hand-written collaborator fakes shared by the unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use watchlog_models::{
    ExternalId, MetadataEntry, Person, RecommendationCandidate, WatchRecord,
};
use watchlog_sources::{MetadataProvider, ProviderError};

/// Provider answering from canned tables and recording every call
#[derive(Default)]
pub(crate) struct FakeProvider {
    /// Ids missing here answer `NotFound`
    pub details: HashMap<ExternalId, Result<MetadataEntry, ProviderError>>,
    /// Keyed by lowercased title
    pub search: HashMap<String, Vec<RecommendationCandidate>>,
    pub search_error: Option<ProviderError>,
    pub discover: Vec<RecommendationCandidate>,
    pub discover_error: Option<ProviderError>,
    pub similar: HashMap<ExternalId, Vec<RecommendationCandidate>>,
    pub similar_error: Option<ProviderError>,
    pub trending: Vec<RecommendationCandidate>,
    pub trending_error: Option<ProviderError>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn fetch_details(&self, id: ExternalId) -> Result<MetadataEntry, ProviderError> {
        self.log(format!("details:{}", id));
        self.details
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::NotFound(id.to_string())))
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        self.log(format!("search:{}", title));
        if let Some(e) = &self.search_error {
            return Err(e.clone());
        }
        Ok(self.search.get(&title.to_lowercase()).cloned().unwrap_or_default())
    }

    async fn discover_by_genres(&self, genres: &[String]) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        self.log(format!("discover:{}", genres.join(",")));
        match &self.discover_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.discover.clone()),
        }
    }

    async fn recommendations_for(&self, id: ExternalId) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        self.log(format!("similar:{}", id));
        match &self.similar_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.similar.get(&id).cloned().unwrap_or_default()),
        }
    }

    async fn trending(&self) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        self.log("trending".to_string());
        match &self.trending_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.trending.clone()),
        }
    }
}

pub(crate) fn candidate(id: ExternalId) -> RecommendationCandidate {
    RecommendationCandidate {
        external_id: id,
        title: format!("Title {}", id),
        release_year: Some(2000 + (id % 25) as i32),
        poster_ref: None,
    }
}

pub(crate) fn candidates(ids: impl IntoIterator<Item = ExternalId>) -> Vec<RecommendationCandidate> {
    ids.into_iter().map(candidate).collect()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn record(id: &str, person: Person, watched_at: Option<NaiveDate>) -> WatchRecord {
    WatchRecord {
        id: id.to_string(),
        title: format!("Movie {}", id),
        watched_at,
        created_at: None,
        person,
        external_id: None,
        release_year: None,
    }
}

pub(crate) fn enriched(id: &str, external_id: ExternalId, watched_at: NaiveDate) -> WatchRecord {
    WatchRecord {
        external_id: Some(external_id),
        ..record(id, Person::Tomi, Some(watched_at))
    }
}
