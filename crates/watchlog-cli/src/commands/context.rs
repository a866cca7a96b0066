use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::sync::Arc;
use watchlog_config::{Config, CredentialStore, PathManager, TMDB_API_KEY_ENV};
use watchlog_core::{FileMetadataStore, MetadataCache, MetadataStore};
use watchlog_models::{Person, WatchRecord};
use watchlog_sources::{JsonRecordStore, TmdbClient, WatchRecordStore};

/// Paths, configuration and credentials shared by every command
pub struct AppContext {
    pub paths: PathManager,
    pub config: Config,
    pub credentials: CredentialStore,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let paths = PathManager::default();
        let config_file = paths.config_file();
        let config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
        config
            .validate()
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;

        let credentials_file = paths.credentials_file();
        let mut credentials = CredentialStore::new(credentials_file.clone());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

        Ok(Self {
            paths,
            config,
            credentials,
        })
    }

    pub fn record_store(&self) -> JsonRecordStore {
        JsonRecordStore::new(self.paths.records_file())
    }

    /// Current snapshot of the record store, newest first
    pub async fn load_records(&self) -> Result<Vec<WatchRecord>> {
        let store = self.record_store();
        store
            .list()
            .await
            .map_err(|e| eyre!("Failed to read watch records from {}: {}", store.path().display(), e))
    }

    pub fn metadata_store(&self) -> FileMetadataStore {
        let compressed = self.config.cache.compression;
        FileMetadataStore::new(self.paths.metadata_cache_file(compressed), compressed)
    }

    pub fn metadata_cache(&self) -> Result<MetadataCache> {
        let store: Arc<dyn MetadataStore> = Arc::new(self.metadata_store());
        let cache = MetadataCache::open(store)
            .map_err(|e| eyre!("Failed to open metadata cache: {}", e))?;
        Ok(cache.with_batch_size(self.config.cache.batch_size))
    }

    pub fn tmdb_client(&self) -> Result<TmdbClient> {
        let api_key = self.credentials.resolve_tmdb_api_key().ok_or_else(|| {
            eyre!(
                "No TMDB API key configured. Set {} or run 'watchlog config tmdb'",
                TMDB_API_KEY_ENV
            )
        })?;
        Ok(TmdbClient::new(api_key, &self.config.tmdb))
    }
}

pub fn parse_person(person: Option<String>) -> Result<Option<Person>> {
    person
        .map(|p| p.parse::<Person>().map_err(|e| eyre!("{} (expected one of: Tomi, Mikkis, Aino, Mari)", e)))
        .transpose()
}
