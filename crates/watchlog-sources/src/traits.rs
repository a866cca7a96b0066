use async_trait::async_trait;
use watchlog_models::{ExternalId, MetadataEntry, RecommendationCandidate, WatchRecord};
use crate::error::{ProviderError, StoreError};

/// Supplier of the raw watch events
#[async_trait]
pub trait WatchRecordStore: Send + Sync {
    /// All records, newest first by the store's own ordering contract
    async fn list(&self) -> Result<Vec<WatchRecord>, StoreError>;
}

/// Third-party catalog used for enrichment and recommendations
///
/// Every call is fallible and may be rate limited. Callers isolate failures per
/// call; nothing here is expected to retry on its own.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Genres and production countries for one title
    async fn fetch_details(&self, id: ExternalId) -> Result<MetadataEntry, ProviderError>;

    async fn search_by_title(&self, title: &str) -> Result<Vec<RecommendationCandidate>, ProviderError>;

    /// Popular titles matching the given genre names, most popular first.
    /// An empty genre list means plain popularity.
    async fn discover_by_genres(&self, genres: &[String]) -> Result<Vec<RecommendationCandidate>, ProviderError>;

    async fn recommendations_for(&self, id: ExternalId) -> Result<Vec<RecommendationCandidate>, ProviderError>;

    /// Globally trending titles this week
    async fn trending(&self) -> Result<Vec<RecommendationCandidate>, ProviderError>;
}
