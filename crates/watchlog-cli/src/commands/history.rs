use super::context::{parse_person, AppContext};
use crate::output::Output;
use chrono::Utc;
use color_eyre::Result;
use owo_colors::OwoColorize;
use watchlog_core::{group_by_year_month, SortDirection};

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

pub async fn run_history(ascending: bool, person: Option<String>, output: &Output) -> Result<()> {
    let person = parse_person(person)?;
    let ctx = AppContext::load()?;

    let mut records = ctx.load_records().await?;
    if let Some(person) = person {
        records.retain(|r| r.person == person);
    }

    let direction = if ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    let grouped = group_by_year_month(&records, direction, Utc::now());
    tracing::debug!("Grouped {} records into {} years", grouped.len(), grouped.years.len());

    output.data(&grouped);
    if grouped.is_empty() {
        output.info("No watch records yet. Import a history log with 'watchlog import <file>'.");
        return Ok(());
    }

    for year in &grouped.years {
        let year_total: usize = year.months.iter().map(|m| m.records.len()).sum();
        output.println(format!("\n{} {}", year.year.to_string().bold().bright_cyan(), format!("({})", year_total).bright_black()));

        for month in &year.months {
            let name = MONTH_NAMES
                .get(month.month as usize - 1)
                .copied()
                .unwrap_or("?");
            output.println(format!("  {}", name.bold()));

            for record in &month.records {
                let day = record
                    .resolvable_date()
                    .map(|d| d.format("%d.%m.").to_string())
                    .unwrap_or_else(|| "  ?  ".to_string());
                let year_suffix = record
                    .known_release_year()
                    .map(|y| format!(" ({})", y))
                    .unwrap_or_default();
                let latest = if grouped.latest_id.as_deref() == Some(record.id.as_str()) {
                    format!(" {}", "← latest".green())
                } else {
                    String::new()
                };
                output.println(format!(
                    "    {} {}{} {}{}",
                    day.bright_black(),
                    record.title,
                    year_suffix,
                    format!("[{}]", record.person).bright_blue(),
                    latest
                ));
            }
        }
    }

    Ok(())
}
