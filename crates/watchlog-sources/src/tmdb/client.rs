use crate::error::ProviderError;
use crate::tmdb::api::{self, TmdbEndpoint};
use crate::traits::MetadataProvider;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use watchlog_config::TmdbConfig;
use watchlog_models::{ExternalId, MetadataEntry, RecommendationCandidate};

/// Create a reqwest Client with the configured per-request timeout
pub fn create_tmdb_client(timeout_seconds: u64) -> Client {
    Client::builder()
        .user_agent(concat!("watchlog/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    language: String,
    /// Lowercased genre name -> TMDB genre id, fetched on first discovery
    genre_ids: Arc<OnceCell<HashMap<String, u32>>>,
}

impl TmdbClient {
    pub fn new(api_key: String, config: &TmdbConfig) -> Self {
        Self {
            client: Arc::new(create_tmdb_client(config.timeout_seconds)),
            api_key,
            base_url: config.base_url.clone(),
            language: config.language.clone(),
            genre_ids: Arc::new(OnceCell::new()),
        }
    }

    fn endpoint(&self) -> TmdbEndpoint<'_> {
        TmdbEndpoint {
            base_url: &self.base_url,
            api_key: &self.api_key,
            language: &self.language,
        }
    }

    async fn genre_ids(&self) -> Result<&HashMap<String, u32>, ProviderError> {
        self.genre_ids
            .get_or_try_init(|| async {
                let ids = api::get_genre_ids(&self.client, &self.endpoint()).await?;
                info!("Loaded {} TMDB genres ({})", ids.len(), self.language);
                Ok::<_, ProviderError>(ids)
            })
            .await
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    fn provider_name(&self) -> &str {
        "tmdb"
    }

    async fn fetch_details(&self, id: ExternalId) -> Result<MetadataEntry, ProviderError> {
        api::get_movie_details(&self.client, &self.endpoint(), id).await
    }

    async fn search_by_title(&self, title: &str) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        api::search_movies(&self.client, &self.endpoint(), title).await
    }

    async fn discover_by_genres(&self, genres: &[String]) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        if genres.is_empty() {
            return api::discover_movies(&self.client, &self.endpoint(), &[]).await;
        }

        let known = self.genre_ids().await?;
        let ids: Vec<u32> = genres
            .iter()
            .filter_map(|name| known.get(&name.to_lowercase()).copied())
            .collect();

        if ids.is_empty() {
            // Falling back to plain popularity would ignore the caller's intent
            debug!("None of the genres {:?} are known to TMDB, skipping discovery", genres);
            return Ok(Vec::new());
        }

        api::discover_movies(&self.client, &self.endpoint(), &ids).await
    }

    async fn recommendations_for(&self, id: ExternalId) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        api::get_recommendations(&self.client, &self.endpoint(), id).await
    }

    async fn trending(&self) -> Result<Vec<RecommendationCandidate>, ProviderError> {
        api::get_trending_week(&self.client, &self.endpoint()).await
    }
}
