pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{CacheConfig, Config, RecommendationConfig, StatsConfig, TmdbConfig};
pub use credentials::{CredentialStore, TMDB_API_KEY_ENV};
pub use paths::{PathManager, container_base_path};
