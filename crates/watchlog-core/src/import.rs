use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{debug, info, warn};
use watchlog_models::{ExternalId, WatchRecord};
use watchlog_sources::{LogEntry, MetadataProvider};

/// Lowercased title with every run of characters outside `[a-z0-9]` collapsed to `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Stable record id for an imported log line, so re-imports are idempotent
pub fn import_record_id(entry: &LogEntry) -> String {
    format!("import-{}-{:02}-{}", entry.year, entry.month, slugify(&entry.title))
}

/// Turn parsed log lines into watch records, enriched by a title search
///
/// The first search hit supplies the external id and release year. A failed or
/// empty search leaves the record unenriched.
pub async fn import_history(
    entries: &[LogEntry],
    provider: &dyn MetadataProvider,
    batch_size: usize,
) -> Vec<WatchRecord> {
    let mut records = Vec::with_capacity(entries.len());
    let mut enriched = 0;

    for batch in entries.chunks(batch_size.max(1)) {
        let lookups = join_all(batch.iter().map(|entry| async move {
            match provider.search_by_title(&entry.title).await {
                Ok(results) => results.into_iter().next(),
                Err(e) => {
                    warn!("Title search failed for '{}': {}", entry.title, e);
                    None
                }
            }
        }))
        .await;

        for (entry, hit) in batch.iter().zip(lookups) {
            let (external_id, release_year): (Option<ExternalId>, Option<i32>) = match hit {
                Some(hit) => {
                    debug!("Matched '{}' to {} ({:?})", entry.title, hit.external_id, hit.title);
                    enriched += 1;
                    (Some(hit.external_id), hit.release_year)
                }
                None => (None, None),
            };

            let watched_at = NaiveDate::from_ymd_opt(entry.year, entry.month, 1);
            if watched_at.is_none() {
                warn!("Invalid month {} for '{}', importing without a date", entry.month, entry.title);
            }

            records.push(WatchRecord {
                id: import_record_id(entry),
                title: entry.title.clone(),
                watched_at,
                created_at: None,
                person: entry.person,
                external_id,
                release_year,
            });
        }
    }

    info!(
        "Prepared {} imported records ({} enriched via {})",
        records.len(),
        enriched,
        provider.provider_name()
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, date, FakeProvider};
    use watchlog_models::Person;
    use watchlog_sources::ProviderError;

    fn entry(title: &str, person: Person, year: i32, month: u32) -> LogEntry {
        LogEntry {
            title: title.to_string(),
            person,
            year,
            month,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Fast & furious"), "fast-furious");
        assert_eq!(slugify("Wayne’s world"), "wayne-s-world");
        assert_eq!(slugify("  Se7en!! "), "se7en");
    }

    #[tokio::test]
    async fn test_import_enriches_from_first_search_hit() {
        let mut provider = FakeProvider::default();
        let mut hit = candidate(9340);
        hit.release_year = Some(1992);
        provider
            .search
            .insert("wayne's world".to_string(), vec![hit, candidate(1)]);

        let entries = vec![
            entry("Wayne's world", Person::Mikkis, 2022, 1),
            entry("Unheard of", Person::Aino, 2022, 6),
        ];
        let records = import_history(&entries, &provider, 5).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "import-2022-01-wayne-s-world");
        assert_eq!(records[0].watched_at, Some(date(2022, 1, 1)));
        assert_eq!(records[0].external_id, Some(9340));
        assert_eq!(records[0].release_year, Some(1992));
        assert_eq!(records[1].person, Person::Aino);
        assert_eq!(records[1].external_id, None);
    }

    #[tokio::test]
    async fn test_search_failures_do_not_abort_import() {
        let provider = FakeProvider {
            search_error: Some(ProviderError::Transient("timeout".to_string())),
            ..Default::default()
        };
        let entries: Vec<LogEntry> = (1..=7)
            .map(|m| entry(&format!("Movie {}", m), Person::Tomi, 2021, m))
            .collect();

        let records = import_history(&entries, &provider, 3).await;
        assert_eq!(records.len(), 7);
        assert!(records.iter().all(|r| r.external_id.is_none()));
        assert_eq!(provider.calls_starting_with("search:").len(), 7);
    }
}
