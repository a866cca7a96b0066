use crate::grouping::newest_first;
use crate::metadata_cache::MetadataLookup;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use watchlog_config::RecommendationConfig;
use watchlog_models::{ExternalId, RecommendationCandidate, WatchRecord};
use watchlog_sources::{MetadataProvider, ProviderError};

#[derive(Debug, Clone)]
pub struct RecommendationOptions {
    /// Output bound
    pub limit: usize,
    /// Most recent records sampled for genre affinity
    pub genre_sample_size: usize,
    pub top_genres: usize,
    /// Most recent distinct titles eligible as similar-title seeds
    pub seed_pool_size: usize,
    pub seed_count: usize,
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self::from_config(&RecommendationConfig::default())
    }
}

impl RecommendationOptions {
    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self {
            limit: config.limit,
            genre_sample_size: config.genre_sample_size,
            top_genres: config.top_genres,
            seed_pool_size: config.seed_pool_size,
            seed_count: config.seed_count,
        }
    }
}

/// Blends genre affinity, similar titles and trending into one unwatched list
///
/// Provider failures only empty the source they happen in; the worst case is
/// an empty list, never an error.
pub struct RecommendationEngine {
    provider: Arc<dyn MetadataProvider>,
    options: RecommendationOptions,
    seed: Option<u64>,
}

impl RecommendationEngine {
    pub fn new(provider: Arc<dyn MetadataProvider>, options: RecommendationOptions) -> Self {
        Self {
            provider,
            options,
            seed: None,
        }
    }

    /// Fix the random choices (seed selection and shuffle)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub async fn recommend<L>(
        &self,
        history: &[WatchRecord],
        lookup: &L,
        exclude: &HashSet<ExternalId>,
        now: DateTime<Utc>,
    ) -> Vec<RecommendationCandidate>
    where
        L: MetadataLookup + ?Sized,
    {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let watched: HashSet<ExternalId> = history.iter().filter_map(|r| r.external_id).collect();

        let merged = if history.is_empty() {
            info!("Empty watch history, recommending trending titles only");
            self.trending_source().await
        } else {
            let recent_ids: Vec<ExternalId> = newest_first(history, now)
                .into_iter()
                .filter_map(|r| r.external_id)
                .collect();

            // Cache reads happen up front so no borrow of the lookup spans an await
            let sample: Vec<ExternalId> = recent_ids
                .iter()
                .copied()
                .take(self.options.genre_sample_size)
                .collect();
            let cached: HashMap<ExternalId, Vec<String>> = sample
                .iter()
                .filter_map(|id| lookup.lookup(*id).map(|entry| (*id, entry.genres.clone())))
                .collect();

            // Rewatches shrink the pool rather than reaching further back
            let mut pool = Vec::new();
            for id in recent_ids.iter().take(self.options.seed_pool_size) {
                if !pool.contains(id) {
                    pool.push(*id);
                }
            }
            let seeds: Vec<ExternalId> = pool
                .choose_multiple(&mut rng, self.options.seed_count)
                .copied()
                .collect();

            let (by_genre, similar, trending) = futures::join!(
                self.genre_source(&sample, cached),
                self.similar_source(&seeds),
                self.trending_source(),
            );

            debug!(
                "Candidate sources: {} genre, {} similar, {} trending",
                by_genre.len(),
                similar.len(),
                trending.len()
            );
            by_genre.into_iter().chain(similar).chain(trending).collect()
        };

        let mut seen = HashSet::new();
        let mut candidates: Vec<RecommendationCandidate> = merged
            .into_iter()
            .filter(|c| !watched.contains(&c.external_id) && !exclude.contains(&c.external_id))
            .filter(|c| seen.insert(c.external_id))
            .collect();

        candidates.shuffle(&mut rng);
        candidates.truncate(self.options.limit);
        info!("Recommending {} titles", candidates.len());
        candidates
    }

    async fn genre_source(
        &self,
        sample: &[ExternalId],
        mut genres_by_id: HashMap<ExternalId, Vec<String>>,
    ) -> Vec<RecommendationCandidate> {
        let mut misses: Vec<ExternalId> = Vec::new();
        for id in sample {
            if !genres_by_id.contains_key(id) && !misses.contains(id) {
                misses.push(*id);
            }
        }

        if !misses.is_empty() {
            debug!("Fetching genres for {} uncached titles", misses.len());
            let fetched = join_all(
                misses
                    .iter()
                    .map(|&id| async move { (id, self.provider.fetch_details(id).await) }),
            )
            .await;
            for (id, result) in fetched {
                match result {
                    Ok(entry) => {
                        genres_by_id.insert(id, entry.genres);
                    }
                    Err(e) => debug!("No genres for {}: {}", id, e),
                }
            }
        }

        // Every sampled viewing counts, so rewatches weigh more
        let mut tally: Vec<(String, usize)> = Vec::new();
        for id in sample {
            for genre in genres_by_id.get(id).into_iter().flatten() {
                match tally.iter_mut().find(|(name, _)| name == genre) {
                    Some((_, count)) => *count += 1,
                    None => tally.push((genre.clone(), 1)),
                }
            }
        }
        // Stable sort keeps first appearance as the tie-break
        tally.sort_by(|a, b| b.1.cmp(&a.1));
        let top: Vec<String> = tally
            .into_iter()
            .take(self.options.top_genres)
            .map(|(name, _)| name)
            .collect();

        if top.is_empty() {
            debug!("No genre affinity available, skipping genre discovery");
            return Vec::new();
        }

        debug!("Top genres: {:?}", top);
        log_source_failure("genre discovery", self.provider.discover_by_genres(&top).await)
    }

    async fn similar_source(&self, seeds: &[ExternalId]) -> Vec<RecommendationCandidate> {
        let results = join_all(
            seeds
                .iter()
                .map(|&id| async move { (id, self.provider.recommendations_for(id).await) }),
        )
        .await;

        results
            .into_iter()
            .flat_map(|(id, result)| {
                log_source_failure(&format!("recommendations for {}", id), result)
            })
            .collect()
    }

    async fn trending_source(&self) -> Vec<RecommendationCandidate> {
        log_source_failure("trending", self.provider.trending().await)
    }
}

fn log_source_failure(
    source: &str,
    result: Result<Vec<RecommendationCandidate>, ProviderError>,
) -> Vec<RecommendationCandidate> {
    result.unwrap_or_else(|e| {
        warn!("Recommendation source {} failed: {}", source, e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, candidates, date, enriched, FakeProvider};
    use chrono::TimeZone;
    use watchlog_models::MetadataEntry;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn genres(names: &[&str]) -> MetadataEntry {
        MetadataEntry::new(names.iter().map(|s| s.to_string()).collect(), vec![])
    }

    fn engine(provider: &Arc<FakeProvider>) -> RecommendationEngine {
        RecommendationEngine::new(provider.clone(), RecommendationOptions::default()).with_seed(11)
    }

    fn no_cache() -> HashMap<ExternalId, MetadataEntry> {
        HashMap::new()
    }

    fn ids(result: &[RecommendationCandidate]) -> HashSet<ExternalId> {
        result.iter().map(|c| c.external_id).collect()
    }

    #[tokio::test]
    async fn test_cold_start_uses_trending_only() {
        let provider = Arc::new(FakeProvider {
            trending: candidates(1..=40),
            discover: candidates(100..=110),
            ..Default::default()
        });

        let result = engine(&provider)
            .recommend(&[], &no_cache(), &HashSet::new(), now())
            .await;

        assert_eq!(result.len(), 30);
        assert_eq!(provider.calls(), vec!["trending".to_string()]);
        assert!(result.iter().all(|c| c.external_id <= 40));
    }

    #[tokio::test]
    async fn test_watched_and_excluded_ids_never_returned_and_no_duplicates() {
        let history = vec![
            enriched("a", 1, date(2024, 5, 1)),
            enriched("b", 2, date(2024, 4, 1)),
        ];
        let mut similar = HashMap::new();
        similar.insert(1, candidates([2, 10, 11]));
        similar.insert(2, candidates([1, 11, 12]));
        let provider = Arc::new(FakeProvider {
            discover: candidates([10, 13, 2]),
            similar,
            trending: candidates([12, 13, 14, 15]),
            ..Default::default()
        });
        let mut cache = no_cache();
        cache.insert(1, genres(&["Drama"]));
        let exclude: HashSet<ExternalId> = [14].into_iter().collect();

        let result = engine(&provider).recommend(&history, &cache, &exclude, now()).await;

        let returned = ids(&result);
        assert_eq!(result.len(), returned.len());
        assert_eq!(returned, [10, 11, 12, 13, 15].into_iter().collect());
    }

    #[tokio::test]
    async fn test_first_occurrence_wins_before_shuffle() {
        let history = vec![enriched("a", 1, date(2024, 5, 1))];
        let mut from_genre = candidate(50);
        from_genre.title = "From genre".to_string();
        let mut from_trending = candidate(50);
        from_trending.title = "From trending".to_string();

        let mut cache = no_cache();
        cache.insert(1, genres(&["Drama"]));
        let provider = Arc::new(FakeProvider {
            discover: vec![from_genre],
            trending: vec![from_trending],
            ..Default::default()
        });

        let result = engine(&provider).recommend(&history, &cache, &HashSet::new(), now()).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "From genre");
    }

    #[tokio::test]
    async fn test_genre_affinity_prefers_cache_and_breaks_ties_by_first_appearance() {
        let history = vec![
            enriched("r1", 1, date(2024, 5, 1)),
            enriched("r2", 2, date(2024, 4, 1)),
            enriched("r3", 3, date(2024, 3, 1)),
            enriched("r4", 4, date(2024, 2, 1)),
            enriched("r5", 1, date(2024, 1, 1)),
        ];
        let mut cache = no_cache();
        cache.insert(1, genres(&["Drama", "Comedy"]));
        cache.insert(2, genres(&["Drama", "Thriller"]));

        let mut provider = FakeProvider::default();
        provider.details.insert(3, Ok(genres(&["Horror", "Comedy"])));
        provider
            .details
            .insert(4, Err(ProviderError::Transient("timeout".to_string())));
        let provider = Arc::new(provider);

        engine(&provider).recommend(&history, &cache, &HashSet::new(), now()).await;

        let mut details = provider.calls_starting_with("details:");
        details.sort();
        assert_eq!(details, vec!["details:3".to_string(), "details:4".to_string()]);
        assert_eq!(
            provider.calls_starting_with("discover:"),
            vec!["discover:Drama,Comedy,Thriller".to_string()]
        );
    }

    #[tokio::test]
    async fn test_similar_seeds_come_from_recent_distinct_titles() {
        // Twelve titles, newest has the highest id
        let history: Vec<WatchRecord> = (1..=12u32)
            .map(|i| enriched(&i.to_string(), i, date(2023, 1, i)))
            .collect();
        let provider = Arc::new(FakeProvider::default());

        engine(&provider)
            .recommend(&history, &no_cache(), &HashSet::new(), now())
            .await;

        let seeds = provider.calls_starting_with("similar:");
        assert_eq!(seeds.len(), 3);
        let distinct: HashSet<&String> = seeds.iter().collect();
        assert_eq!(distinct.len(), 3);
        for seed in &seeds {
            let id: u32 = seed.trim_start_matches("similar:").parse().unwrap();
            assert!(id >= 3, "seed {} is older than the ten most recent titles", id);
        }
    }

    #[tokio::test]
    async fn test_rewatches_do_not_widen_the_seed_pool() {
        // The ten most recent viewings are rewatches of titles 1 and 2
        let mut history: Vec<WatchRecord> = (0..10u32)
            .map(|i| enriched(&format!("re{}", i), 1 + i % 2, date(2024, 3, 20 - i)))
            .collect();
        history.extend((3..=7u32).map(|i| enriched(&format!("old{}", i), i, date(2023, 1, i))));
        let provider = Arc::new(FakeProvider::default());

        engine(&provider)
            .recommend(&history, &no_cache(), &HashSet::new(), now())
            .await;

        let mut seeds = provider.calls_starting_with("similar:");
        seeds.sort();
        assert_eq!(seeds, vec!["similar:1".to_string(), "similar:2".to_string()]);
    }

    #[tokio::test]
    async fn test_watched_and_excluded_ids_filtered_when_only_trending_answers() {
        let history = vec![
            enriched("a", 1, date(2024, 5, 1)),
            enriched("b", 2, date(2024, 4, 1)),
        ];
        let mut cache = no_cache();
        cache.insert(1, genres(&["Drama"]));
        let provider = Arc::new(FakeProvider {
            discover_error: Some(ProviderError::Transient("down".to_string())),
            similar_error: Some(ProviderError::RateLimited { retry_after: Some(1) }),
            trending: candidates([1, 2, 5, 6, 2, 7]),
            ..Default::default()
        });
        let exclude: HashSet<ExternalId> = [6].into_iter().collect();

        let result = engine(&provider).recommend(&history, &cache, &exclude, now()).await;

        assert_eq!(result.len(), 2);
        assert_eq!(ids(&result), [5, 7].into_iter().collect());
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_the_others() {
        let history = vec![enriched("a", 1, date(2024, 5, 1))];
        let mut cache = no_cache();
        cache.insert(1, genres(&["Drama"]));
        let provider = Arc::new(FakeProvider {
            discover_error: Some(ProviderError::Malformed("bad payload".to_string())),
            similar_error: Some(ProviderError::Transient("reset".to_string())),
            trending: candidates([7, 8]),
            ..Default::default()
        });

        let result = engine(&provider).recommend(&history, &cache, &HashSet::new(), now()).await;
        assert_eq!(ids(&result), [7, 8].into_iter().collect());
    }

    #[tokio::test]
    async fn test_all_sources_failing_returns_empty() {
        let history = vec![enriched("a", 1, date(2024, 5, 1))];
        let mut cache = no_cache();
        cache.insert(1, genres(&["Drama"]));
        let provider = Arc::new(FakeProvider {
            discover_error: Some(ProviderError::Transient("down".to_string())),
            similar_error: Some(ProviderError::Transient("down".to_string())),
            trending_error: Some(ProviderError::RateLimited { retry_after: None }),
            ..Default::default()
        });

        let result = engine(&provider).recommend(&history, &cache, &HashSet::new(), now()).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_same_seed_gives_same_order() {
        let history = vec![enriched("a", 1, date(2024, 5, 1))];
        let provider = Arc::new(FakeProvider {
            trending: candidates(2..=20),
            ..Default::default()
        });

        let first = engine(&provider).recommend(&history, &no_cache(), &HashSet::new(), now()).await;
        let second = engine(&provider).recommend(&history, &no_cache(), &HashSet::new(), now()).await;
        assert_eq!(first, second);
    }
}
