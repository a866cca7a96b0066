use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs;
use std::path::Path;
use watchlog_config::{Config, PathManager};

pub async fn run_clear(all: bool, cache: bool, credentials: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    if all {
        clear_cache(&path_manager, output)?;
        clear_credentials(&path_manager, output)?;
        output.success("Metadata cache and credentials cleared");
        return Ok(());
    }

    let mut cleared_anything = false;

    if cache {
        clear_cache(&path_manager, output)?;
        cleared_anything = true;
    }

    if credentials {
        clear_credentials(&path_manager, output)?;
        cleared_anything = true;
    }

    if !cleared_anything {
        output.warn("No clear option specified. Use --cache, --credentials, or --all");
        output.println("\nExample: watchlog clear --cache");
    }

    Ok(())
}

fn clear_cache(path_manager: &PathManager, output: &Output) -> Result<()> {
    // Both layouts, in case compression was toggled since the cache was written
    let mut removed = 0;
    for compressed in [true, false] {
        let file = path_manager.metadata_cache_file(compressed);
        removed += remove_if_exists(&file)?;
        removed += remove_if_exists(&file.with_extension("bak"))?;
    }

    if removed > 0 {
        let compression = Config::load_or_default(&path_manager.config_file())
            .map(|c| c.cache.compression)
            .unwrap_or(true);
        output.success(format!(
            "Cleared metadata cache: {}",
            path_manager.metadata_cache_file(compression).display()
        ));
        output.info("Entries are fetched again on the next 'watchlog metadata sync'.");
    } else {
        output.info("No metadata cache found to clear");
    }

    Ok(())
}

fn clear_credentials(path_manager: &PathManager, output: &Output) -> Result<()> {
    let credentials_file = path_manager.credentials_file();

    if remove_if_exists(&credentials_file)? > 0 {
        output.success(format!("Cleared credentials: {}", credentials_file.display()));
    } else {
        output.info("No credentials file found to clear");
    }

    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    fs::remove_file(path).map_err(|e| eyre!("Failed to remove {}: {}", path.display(), e))?;
    tracing::debug!("Removed {}", path.display());
    Ok(1)
}
