use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};
use watchlog_models::{Country, ExternalId, MetadataEntry, RecommendationCandidate};
use crate::error::ProviderError;

/// Connection parameters shared by every TMDB request
pub struct TmdbEndpoint<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub language: &'a str,
}

impl TmdbEndpoint<'_> {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCountry {
    iso_3166_1: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetails {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    production_countries: Vec<TmdbCountry>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u32,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

/// Year part of a TMDB "YYYY-MM-DD" date; empty strings mean unknown
fn parse_release_year(release_date: Option<&str>) -> Option<i32> {
    release_date
        .and_then(|d| d.split('-').next())
        .and_then(|y| y.parse::<i32>().ok())
        .filter(|y| *y > 0)
}

fn to_candidates(page: TmdbPage) -> Vec<RecommendationCandidate> {
    page.results
        .into_iter()
        .filter_map(|movie| {
            // Untitled entries cannot be shown to anyone
            let title = movie.title.filter(|t| !t.trim().is_empty())?;
            Some(RecommendationCandidate {
                external_id: movie.id,
                title,
                release_year: parse_release_year(movie.release_date.as_deref()),
                poster_ref: movie.poster_path,
            })
        })
        .collect()
}

/// GET a TMDB resource and map HTTP failures onto the provider error taxonomy
async fn get_json<T: DeserializeOwned>(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
    path: &str,
    query: &[(&str, String)],
) -> Result<T, ProviderError> {
    let url = endpoint.url(path);
    debug!("TMDB request: {}", path);

    let response = client
        .get(&url)
        .query(&[("api_key", endpoint.api_key), ("language", endpoint.language)])
        .query(query)
        .header("Accept", "application/json")
        .send()
        .await
        // The URL carries the api key, keep it out of error messages
        .map_err(|e| ProviderError::from(e.without_url()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(path.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        warn!("TMDB rate limit hit on {} (retry after {:?}s)", path, retry_after);
        return Err(ProviderError::RateLimited { retry_after });
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::Transient(format!("{} on {}: {}", status, path, error_text)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Malformed(format!("{}: {}", path, e.without_url())))
}

/// Fetch genres and production countries for one movie
pub async fn get_movie_details(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
    id: ExternalId,
) -> Result<MetadataEntry, ProviderError> {
    let path = format!("movie/{}", id);
    let details: TmdbMovieDetails = get_json(client, endpoint, &path, &[]).await?;

    if details.success == Some(false) {
        return Err(ProviderError::NotFound(path));
    }

    Ok(MetadataEntry::new(
        details.genres.into_iter().map(|g| g.name).collect(),
        details
            .production_countries
            .into_iter()
            .map(|c| Country {
                code: Some(c.iso_3166_1),
                name: c.name,
            })
            .collect(),
    ))
}

pub async fn search_movies(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
    title: &str,
) -> Result<Vec<RecommendationCandidate>, ProviderError> {
    let page: TmdbPage = get_json(client, endpoint, "search/movie", &[("query", title.to_string())]).await?;
    Ok(to_candidates(page))
}

/// Discover movies sorted by popularity, optionally restricted to genre ids
pub async fn discover_movies(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
    genre_ids: &[u32],
) -> Result<Vec<RecommendationCandidate>, ProviderError> {
    let mut query = vec![
        ("sort_by", "popularity.desc".to_string()),
        ("include_adult", "false".to_string()),
        ("page", "1".to_string()),
    ];
    if !genre_ids.is_empty() {
        let joined = genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        query.push(("with_genres", joined));
    }
    let page: TmdbPage = get_json(client, endpoint, "discover/movie", &query).await?;
    Ok(to_candidates(page))
}

pub async fn get_recommendations(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
    id: ExternalId,
) -> Result<Vec<RecommendationCandidate>, ProviderError> {
    let path = format!("movie/{}/recommendations", id);
    let page: TmdbPage = get_json(client, endpoint, &path, &[("page", "1".to_string())]).await?;
    Ok(to_candidates(page))
}

pub async fn get_trending_week(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
) -> Result<Vec<RecommendationCandidate>, ProviderError> {
    let page: TmdbPage = get_json(client, endpoint, "trending/movie/week", &[]).await?;
    Ok(to_candidates(page))
}

/// Genre name (lowercased) to TMDB genre id, in the configured language
pub async fn get_genre_ids(
    client: &Client,
    endpoint: &TmdbEndpoint<'_>,
) -> Result<HashMap<String, u32>, ProviderError> {
    let list: TmdbGenreList = get_json(client, endpoint, "genre/movie/list", &[]).await?;
    Ok(list
        .genres
        .into_iter()
        .map(|g| (g.name.to_lowercase(), g.id))
        .collect())
}
