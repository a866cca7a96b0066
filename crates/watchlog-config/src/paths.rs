use anyhow::Result;
use dirs;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("WATCHLOG_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("watchlog");

        Ok(Self::with_base(base_dir))
    }

    pub fn from_docker_env() -> Self {
        // In containers, config files sit at the base level with data/logs in subdirs
        Self::with_base(container_base_path())
    }

    /// Lay everything out under a single directory
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_dir: base.clone(),
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Metadata cache file; the `.gz` suffix is added when compression is on
    pub fn metadata_cache_file(&self, compressed: bool) -> PathBuf {
        if compressed {
            self.cache_dir().join("metadata.json.gz")
        } else {
            self.cache_dir().join("metadata.json")
        }
    }

    pub fn records_file(&self) -> PathBuf {
        self.data_dir.join("records.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("watchlog.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        std::fs::create_dir_all(self.cache_dir())?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // The container base directory is created in the image, so its presence means Docker
        let base = container_base_path();
        if base.exists() {
            return Self::from_docker_env();
        }

        // Otherwise, use platform-specific paths (e.g., ~/.config/watchlog on Linux)
        Self::new().unwrap_or_else(|_| Self::from_docker_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let paths = PathManager::with_base(PathBuf::from("/srv/watchlog"));
        assert_eq!(paths.records_file(), PathBuf::from("/srv/watchlog/data/records.json"));
        assert_eq!(
            paths.metadata_cache_file(true),
            PathBuf::from("/srv/watchlog/data/cache/metadata.json.gz")
        );
        assert_eq!(paths.config_file(), PathBuf::from("/srv/watchlog/config.toml"));
        assert_eq!(paths.log_file(), PathBuf::from("/srv/watchlog/logs/watchlog.log"));
    }
}
