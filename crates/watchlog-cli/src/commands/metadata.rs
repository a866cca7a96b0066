use super::context::AppContext;
use super::progress::BatchProgressUI;
use crate::output::Output;
use crate::MetadataCommands;
use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;
use watchlog_core::needs_refresh;

pub async fn run_metadata(cmd: MetadataCommands, output: &Output) -> Result<()> {
    match cmd {
        MetadataCommands::Sync => sync_metadata(output).await,
        MetadataCommands::Status => metadata_status(output).await,
    }
}

async fn sync_metadata(output: &Output) -> Result<()> {
    let mut ctx = AppContext::load()?;
    ctx.paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {}", e))?;

    let records = ctx.load_records().await?;
    let client = ctx.tmdb_client()?;
    let mut cache = ctx.metadata_cache()?;

    let stale = cache.stale_ids(&records).len();
    if stale == 0 {
        output.success(format!("Metadata cache is up to date ({} entries)", cache.len()));
        output.data(&json!({ "requested": 0, "cached": cache.len() }));
        return Ok(());
    }

    output.info(format!("Fetching metadata for {} titles...", stale));
    let ui = BatchProgressUI::new("metadata", stale, output.is_quiet());
    let report = cache
        .reconcile_with_progress(&records, &client, |progress| ui.update(progress))
        .await;
    ui.finish();

    ctx.credentials.set_last_reconcile(Utc::now());
    if let Err(e) = ctx.credentials.save() {
        tracing::warn!("Failed to record reconcile time: {}", e);
    }

    output.data(&json!({
        "requested": report.requested,
        "fetched": report.fetched,
        "failed": report.failed,
        "not_found": report.not_found,
        "skipped": report.skipped,
        "rate_limited": report.rate_limited,
        "persist_failures": report.persist_failures,
        "cached": cache.len(),
    }));

    output.success(format!("Fetched {} of {} titles", report.fetched, report.requested));
    if report.not_found > 0 {
        output.warn(format!("{} titles are unknown to TMDB", report.not_found));
    }
    if report.failed > 0 || report.skipped > 0 {
        output.warn(format!(
            "{} failed and {} skipped; run 'watchlog metadata sync' again to retry them",
            report.failed, report.skipped
        ));
    }
    if report.rate_limited {
        output.warn("TMDB rate limit reached, stopped early");
    }
    if report.persist_failures > 0 {
        output.error(format!(
            "{} batches could not be written to {}",
            report.persist_failures,
            ctx.paths.metadata_cache_file(ctx.config.cache.compression).display()
        ));
    }

    Ok(())
}

async fn metadata_status(output: &Output) -> Result<()> {
    let ctx = AppContext::load()?;
    let records = ctx.load_records().await?;
    let cache = ctx.metadata_cache()?;

    let enriched = records.iter().filter(|r| r.external_id.is_some()).count();
    let legacy = records
        .iter()
        .filter_map(|r| r.external_id)
        .filter_map(|id| cache.get(id))
        .filter(|entry| needs_refresh(Some(entry)))
        .count();
    let stale = cache.stale_ids(&records).len();
    let last = ctx.credentials.get_last_reconcile();

    output.data(&json!({
        "records": records.len(),
        "records_with_id": enriched,
        "cached": cache.len(),
        "stale": stale,
        "legacy_records": legacy,
        "last_reconcile": last.map(|t| t.to_rfc3339()),
    }));

    output.println(format!("Records:            {}", records.len()));
    output.println(format!("With TMDB id:       {}", enriched));
    output.println(format!("Cached entries:     {}", cache.len()));
    output.println(format!("Needing refresh:    {}", stale));
    output.println(format!(
        "Last sync:          {}",
        last.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    ));
    if legacy > 0 {
        output.warn(format!("{} records point at legacy-format entries", legacy));
    }

    Ok(())
}
