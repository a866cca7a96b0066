use super::context::{parse_person, AppContext};
use crate::output::Output;
use chrono::Utc;
use color_eyre::Result;
use comfy_table::{presets, Cell, Table};
use owo_colors::OwoColorize;
use watchlog_core::{compute_stats, NamedCount, SortDirection, StatsOptions};

pub async fn run_stats(person: Option<String>, full: bool, decades_desc: bool, output: &Output) -> Result<()> {
    let person = parse_person(person)?;
    let ctx = AppContext::load()?;
    let records = ctx.load_records().await?;
    let cache = ctx.metadata_cache()?;

    let mut options = StatsOptions::from_config(&ctx.config.stats);
    options.person = person;
    if full {
        options.genre_top_n = None;
        options.country_top_n = None;
    }
    if decades_desc {
        options.decade_order = SortDirection::Descending;
    }

    let report = compute_stats(&records, &cache, &options, Utc::now());
    output.data(&report);

    let stale = cache.stale_ids(&records).len();
    if stale > 0 {
        output.warn(format!(
            "{} titles have no current metadata; genre and country figures are partial. Run 'watchlog metadata sync'.",
            stale
        ));
    }

    if !output.is_human() || output.is_quiet() {
        return Ok(());
    }

    let scope = match report.person {
        Some(p) => format!("Statistics for {}", p),
        None => "Statistics".to_string(),
    };
    println!("\n{}", scope.bold().bright_cyan());
    println!("{} records, {} per month on average\n", report.total, report.pace.to_string().bold());

    print_counts("Turns", &report.turns_per_person);
    print_counts("Movies per month", &report.monthly_activity);
    print_counts("Release decades", &report.decades);
    print_counts("Genres", &report.genres);

    let mut countries = Table::new();
    countries.load_preset(presets::UTF8_FULL);
    countries.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    countries.set_header(vec![
        Cell::new("Countries").fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Count"),
    ]);
    for country in &report.countries {
        let flag = country.flag();
        let label = if flag.is_empty() {
            country.name.clone()
        } else {
            format!("{} {}", flag, country.name)
        };
        countries.add_row(vec![Cell::new(label), Cell::new(country.count)]);
    }
    println!("{}\n", countries);

    Ok(())
}

fn print_counts(title: &str, counts: &[NamedCount]) {
    if counts.is_empty() {
        println!("{}: {}\n", title, "no data".bright_black());
        return;
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new(title).fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
        Cell::new("Count"),
    ]);
    for entry in counts {
        table.add_row(vec![Cell::new(&entry.name), Cell::new(entry.count)]);
    }
    println!("{}\n", table);
}
