//! HTTP mapping tests for the TMDB client against a mock server.

use watchlog_config::TmdbConfig;
use watchlog_models::{Countries, Country};
use watchlog_sources::{MetadataProvider, ProviderError, TmdbClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TmdbClient {
    let config = TmdbConfig {
        base_url: server.uri(),
        language: "fi-FI".to_string(),
        timeout_seconds: 5,
    };
    TmdbClient::new("test-key".to_string(), &config)
}

#[tokio::test]
async fn test_fetch_details_maps_genres_and_countries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/550"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("language", "fi-FI"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 550,
            "genres": [{"id": 18, "name": "Draama"}, {"id": 53, "name": "Jännitys"}],
            "production_countries": [
                {"iso_3166_1": "US", "name": "United States of America"},
                {"iso_3166_1": "DE", "name": "Germany"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = client_for(&server).fetch_details(550).await.unwrap();
    assert_eq!(entry.genres, vec!["Draama".to_string(), "Jännitys".to_string()]);
    assert_eq!(
        entry.countries,
        Countries::Resolved(vec![
            Country::new("US", "United States of America"),
            Country::new("DE", "Germany"),
        ])
    );
}

#[tokio::test]
async fn test_status_codes_map_to_error_taxonomy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "success": false,
            "status_code": 34
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/2"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/3"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(matches!(client.fetch_details(1).await, Err(ProviderError::NotFound(_))));
    assert_eq!(
        client.fetch_details(2).await,
        Err(ProviderError::RateLimited { retry_after: Some(3) })
    );
    assert!(matches!(client.fetch_details(3).await, Err(ProviderError::Transient(_))));
    assert!(matches!(client.fetch_details(4).await, Err(ProviderError::Malformed(_))));
}

#[tokio::test]
async fn test_discover_resolves_genre_names_to_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/genre/movie/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "genres": [{"id": 18, "name": "Draama"}, {"id": 35, "name": "Komedia"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("with_genres", "35,18"))
        .and(query_param("sort_by", "popularity.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"id": 9, "title": "Palm Springs", "release_date": "2020-07-10", "poster_path": "/p.jpg"}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let genres = vec!["komedia".to_string(), "Draama".to_string(), "Tuntematon".to_string()];
    let first = client.discover_by_genres(&genres).await.unwrap();
    // Second call reuses the memoised genre list
    let second = client.discover_by_genres(&genres).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].external_id, 9);
    assert_eq!(first[0].release_year, Some(2020));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_trending_and_recommendations() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trending/movie/week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"id": 1, "title": "A"}, {"id": 2, "title": "B", "release_date": ""}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/77/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let trending = client.trending().await.unwrap();
    assert_eq!(trending.len(), 2);
    assert_eq!(trending[1].release_year, None);
    assert!(client.recommendations_for(77).await.unwrap().is_empty());
}
