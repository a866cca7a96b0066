use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_tmdb_language")]
    pub language: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Concurrent provider calls per reconciliation batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Gzip the on-disk metadata cache
    #[serde(default = "default_true")]
    pub compression: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Genre chart truncation; list views ignore it
    #[serde(default = "default_genre_top_n")]
    pub genre_top_n: usize,
    #[serde(default = "default_country_top_n")]
    pub country_top_n: usize,
    /// Co-productions involving this country are counted under it
    #[serde(default = "default_home_country_code")]
    pub home_country_code: String,
    #[serde(default = "default_home_country_name")]
    pub home_country_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_recommendation_limit")]
    pub limit: usize,
    #[serde(default = "default_genre_sample_size")]
    pub genre_sample_size: usize,
    #[serde(default = "default_top_genres")]
    pub top_genres: usize,
    #[serde(default = "default_seed_pool_size")]
    pub seed_pool_size: usize,
    #[serde(default = "default_seed_count")]
    pub seed_count: usize,
}

fn default_true() -> bool {
    true
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "fi-FI".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_batch_size() -> usize {
    5
}

fn default_genre_top_n() -> usize {
    6
}

fn default_country_top_n() -> usize {
    10
}

fn default_home_country_code() -> String {
    "FI".to_string()
}

fn default_home_country_name() -> String {
    "Finland".to_string()
}

fn default_recommendation_limit() -> usize {
    30
}

fn default_genre_sample_size() -> usize {
    20
}

fn default_top_genres() -> usize {
    3
}

fn default_seed_pool_size() -> usize {
    10
}

fn default_seed_count() -> usize {
    3
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_tmdb_base_url(),
            language: default_tmdb_language(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            compression: default_true(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            genre_top_n: default_genre_top_n(),
            country_top_n: default_country_top_n(),
            home_country_code: default_home_country_code(),
            home_country_name: default_home_country_name(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            limit: default_recommendation_limit(),
            genre_sample_size: default_genre_sample_size(),
            top_genres: default_top_genres(),
            seed_pool_size: default_seed_pool_size(),
            seed_count: default_seed_count(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it does not exist yet
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tmdb.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("tmdb.base_url cannot be empty"));
        }
        if self.tmdb.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("tmdb.timeout_seconds must be positive"));
        }
        if self.cache.batch_size == 0 {
            return Err(anyhow::anyhow!("cache.batch_size must be positive"));
        }
        if self.recommendations.limit == 0 {
            return Err(anyhow::anyhow!("recommendations.limit must be positive"));
        }
        if self.recommendations.seed_count > self.recommendations.seed_pool_size {
            return Err(anyhow::anyhow!(
                "recommendations.seed_count ({}) cannot exceed seed_pool_size ({})",
                self.recommendations.seed_count,
                self.recommendations.seed_pool_size
            ));
        }
        if self.stats.home_country_code.trim().is_empty() && self.stats.home_country_name.trim().is_empty() {
            return Err(anyhow::anyhow!("stats.home_country_code or home_country_name must be set"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.tmdb.language = "en-US".to_string();
        config.cache.batch_size = 8;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.tmdb.language, "en-US");
        assert_eq!(loaded.cache.batch_size, 8);
        assert_eq!(loaded.recommendations.limit, 30);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[stats]\ngenre_top_n = 3\n").unwrap();
        assert_eq!(config.stats.genre_top_n, 3);
        assert_eq!(config.stats.home_country_code, "FI");
        assert_eq!(config.cache.batch_size, 5);
        assert!(config.cache.compression);
        assert_eq!(config.tmdb.base_url, "https://api.themoviedb.org/3");
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.cache.batch_size = 0;
        assert!(config.validate().is_err());

        config.cache.batch_size = 5;
        config.recommendations.seed_count = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.recommendations.seed_count, 3);
    }
}
