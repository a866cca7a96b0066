use super::context::AppContext;
use crate::output::Output;
use chrono::Utc;
use color_eyre::Result;
use owo_colors::OwoColorize;
use std::collections::HashSet;
use std::sync::Arc;
use watchlog_core::{RecommendationEngine, RecommendationOptions};
use watchlog_models::ExternalId;

pub async fn run_recommend(
    exclude: Vec<u32>,
    limit: Option<usize>,
    seed: Option<u64>,
    output: &Output,
) -> Result<()> {
    let ctx = AppContext::load()?;
    let records = ctx.load_records().await?;
    let cache = ctx.metadata_cache()?;
    let client = Arc::new(ctx.tmdb_client()?);

    let mut options = RecommendationOptions::from_config(&ctx.config.recommendations);
    if let Some(limit) = limit {
        options.limit = limit;
    }

    let mut engine = RecommendationEngine::new(client, options);
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }

    let exclude: HashSet<ExternalId> = exclude.into_iter().collect();
    let candidates = engine.recommend(&records, &cache, &exclude, Utc::now()).await;

    output.data(&candidates);
    if candidates.is_empty() {
        output.warn("No recommendations right now. Try again later.");
        return Ok(());
    }

    output.println(format!("\n{}", "Recommendations".bold().bright_cyan()));
    for candidate in &candidates {
        let year = candidate
            .release_year
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        output.println(format!(
            "  {}{} {}",
            candidate.title,
            year,
            format!("tmdb:{}", candidate.external_id).bright_black()
        ));
    }
    output.println("");

    Ok(())
}
