use super::context::AppContext;
use crate::output::Output;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use serde_json::json;
use std::path::PathBuf;
use watchlog_core::import_history;
use watchlog_sources::parse_history_log;

pub async fn run_import(file: PathBuf, dry_run: bool, output: &Output) -> Result<()> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .wrap_err_with(|| format!("Failed to read history log {}", file.display()))?;

    let entries = parse_history_log(&text);
    if entries.is_empty() {
        output.warn(format!("No importable lines found in {}", file.display()));
        return Ok(());
    }
    output.info(format!("Parsed {} entries, matching titles against TMDB...", entries.len()));

    let ctx = AppContext::load()?;
    let client = ctx.tmdb_client()?;
    let records = import_history(&entries, &client, ctx.config.cache.batch_size).await;
    let matched = records.iter().filter(|r| r.external_id.is_some()).count();

    if dry_run {
        output.data(&records);
        for record in &records {
            let id = record
                .external_id
                .map(|id| format!("tmdb:{}", id))
                .unwrap_or_else(|| "unmatched".to_string());
            output.println(format!("  {}  {} ({}) {}", record.id, record.title, record.person, id));
        }
        output.success(format!(
            "Dry run: {} records prepared, {} matched. Nothing written.",
            records.len(),
            matched
        ));
        return Ok(());
    }

    ctx.paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {}", e))?;
    let store = ctx.record_store();
    let added = store
        .insert_missing(&records)
        .await
        .map_err(|e| eyre!("Failed to write records to {}: {}", store.path().display(), e))?;

    output.data(&json!({
        "parsed": entries.len(),
        "matched": matched,
        "added": added,
    }));
    output.success(format!(
        "Imported {} new records ({} already present, {} matched to TMDB)",
        added,
        records.len() - added,
        matched
    ));
    if matched < records.len() {
        output.info("Unmatched titles stay without metadata and are left out of genre and country statistics.");
    }

    Ok(())
}
