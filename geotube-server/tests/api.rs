use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use geotube_core::{
    age_gate::Navigator,
    client::{ExploreApi, HttpApi},
    explore::{Explorer, FetchOutcome},
    geocode::GeocoderConfig,
    keywords::KeywordConfig,
    models::NewHistoryEntry,
    store::Store,
    youtube::YouTubeConfig,
    Coordinate, Credentials,
};
use geotube_server::{config::Config, router, state::AppState};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

type Queries = Arc<Mutex<Vec<String>>>;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

/// Nominatim and YouTube stand-ins. The reverse response depends on latitude:
/// 10 → city, 20 → state + country, 30 → no address, 40 → provider error.
async fn spawn_providers(queries: Queries) -> String {
    let app = Router::new()
        .route(
            "/reverse",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let lat: f64 = q["lat"].parse().unwrap();
                match lat as i64 {
                    10 => (StatusCode::OK, Json(json!({ "address": { "city": "Oaxaca de Juárez", "state": "Oaxaca" } }))),
                    20 => (StatusCode::OK, Json(json!({ "address": { "state": "Jalisco", "country": "México" } }))),
                    30 => (StatusCode::OK, Json(json!({ "error": "Unable to geocode" }))),
                    40 => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
                    _ => (StatusCode::OK, Json(json!({ "address": { "country": "Somewhere" } }))),
                }
            }),
        )
        .route(
            "/yt/search",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let queries = queries.clone();
                async move {
                    queries.lock().await.push(q["q"].clone());
                    Json::<Value>(json!({ "items": [
                        { "id": { "videoId": "ok1" }, "snippet": { "title": q["q"], "channelTitle": "Canal" } },
                        { "id": { "videoId": "r18" }, "snippet": { "title": "Solo adultos", "channelTitle": "Canal" } }
                    ]}))
                }
            }),
        )
        .route(
            "/yt/videos",
            get(|| async {
                Json(json!({ "items": [
                    { "id": "ok1", "contentDetails": {} },
                    { "id": "r18", "contentDetails": { "contentRating": { "ytRating": "ytAgeRestricted" } } }
                ]}))
            }),
        );

    serve(app).await
}

fn config(providers: &str) -> Config {
    Config {
        port: 0,
        database_path: PathBuf::new(),
        geocoder: GeocoderConfig {
            url: format!("{providers}/reverse"),
            ..Default::default()
        },
        youtube: YouTubeConfig {
            api_url: format!("{providers}/yt"),
            api_key: Some("test-key".into()),
        },
    }
}

async fn spawn_app_with(config: Config) -> String {
    let state = AppState::with_store(config, Store::open_in_memory().unwrap()).unwrap();
    serve(router(state)).await
}

async fn spawn_app() -> (String, Queries) {
    let queries = Queries::default();
    let providers = spawn_providers(queries.clone()).await;
    (spawn_app_with(config(&providers)).await, queries)
}

async fn geocode(base: &str, query: &str) -> (StatusCode, Value) {
    let response = reqwest::get(format!("{base}/api/location/geocode?{query}"))
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

// ============================================================================
// Geocode
// ============================================================================

#[tokio::test]
async fn geocode_accepts_full_range() {
    let (base, _) = spawn_app().await;

    for query in ["lat=-90&lon=-180", "lat=90&lon=180", "lat=0&lon=0", "lat=-45.5&lon=179.99"] {
        let (status, body) = geocode(&base, query).await;
        assert_eq!(status, StatusCode::OK, "{query}");
        assert!(body["locationName"].is_string());
    }
}

#[tokio::test]
async fn geocode_rejects_bad_input() {
    let (base, _) = spawn_app().await;

    for query in [
        "lat=91&lon=0",
        "lat=-90.01&lon=0",
        "lat=0&lon=180.5",
        "lat=0&lon=-181",
        "lat=abc&lon=0",
        "lat=NaN&lon=0",
        "lon=0",
        "lat=10",
        "",
    ] {
        let (status, body) = geocode(&base, query).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn undecodable_query_is_json_400() {
    let (base, _) = spawn_app().await;

    let (status, body) = geocode(&base, "lat=1&lat=2&lon=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let response = reqwest::get(format!("{base}/api/videos/search?location=a&location=b"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn geocode_resolution_policy() {
    let (base, _) = spawn_app().await;

    let (_, body) = geocode(&base, "lat=10&lon=0").await;
    assert_eq!(body, json!({ "locationName": "Oaxaca de Juárez" }));

    let (_, body) = geocode(&base, "lat=20&lon=0").await;
    assert_eq!(body["locationName"], "Jalisco");

    let (status, body) = geocode(&base, "lat=30&lon=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locationName"], "Mundo");

    let (status, body) = geocode(&base, "lat=40&lon=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locationName"], "Mundo");
}

#[tokio::test]
async fn geocode_is_idempotent() {
    let (base, _) = spawn_app().await;
    let first = geocode(&base, "lat=20.5&lon=-103.3").await;
    let second = geocode(&base, "lat=20.5&lon=-103.3").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn geocode_construction_failure_is_500() {
    let mut config = config("http://127.0.0.1:1");
    config.geocoder.url = "not a url".into();
    let base = spawn_app_with(config).await;

    let (status, body) = geocode(&base, "lat=10&lon=0").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn geocode_without_sentinel_is_404() {
    let providers = spawn_providers(Queries::default()).await;
    let mut config = config(&providers);
    config.geocoder.fallback = String::new();
    let base = spawn_app_with(config).await;

    let (status, _) = geocode(&base, "lat=30&lon=0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_provider_falls_back() {
    let base = spawn_app_with(config("http://127.0.0.1:1")).await;
    let (status, body) = geocode(&base, "lat=10&lon=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locationName"], "Mundo");
}

// ============================================================================
// Video search
// ============================================================================

#[tokio::test]
async fn video_search_passes_results_through() {
    let (base, queries) = spawn_app().await;

    let videos: Value = reqwest::get(format!(
        "{base}/api/videos/search?searchTerm=gatos%20videos&location=Oaxaca&maxResults=15"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(videos[0]["id"], "ok1");
    assert_eq!(videos[0]["title"], "gatos videos Oaxaca");
    assert_eq!(videos[0]["ageRestricted"], false);
    assert_eq!(videos[1]["ageRestricted"], true);
    assert_eq!(queries.lock().await.as_slice(), ["gatos videos Oaxaca"]);
}

#[tokio::test]
async fn video_search_validates_max_results() {
    let (base, _) = spawn_app().await;
    let response = reqwest::get(format!("{base}/api/videos/search?maxResults=lots"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn video_search_without_key_is_500() {
    let providers = spawn_providers(Queries::default()).await;
    let mut config = config(&providers);
    config.youtube.api_key = None;
    let base = spawn_app_with(config).await;

    let response = reqwest::get(format!("{base}/api/videos/search?searchTerm=videos"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Could not fetch videos");
}

// ============================================================================
// Accounts & history
// ============================================================================

async fn register(base: &str, username: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "username": username, "password": "secreto1" }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn register_login_and_history() {
    let (base, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = register(&base, "ana").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(register(&base, "ana").await.status(), StatusCode::CONFLICT);

    let login: Value = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "username": "ana", "password": "secreto1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap().to_string();

    let bad_login = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "username": "ana", "password": "nope-nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_login.status(), StatusCode::UNAUTHORIZED);

    let created = client
        .post(format!("{base}/api/users/history"))
        .bearer_auth(&token)
        .json(&json!({ "videoId": "abc", "title": "Gatos en el parque" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let history: Value = client
        .get(format!("{base}/api/users/history"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["videoId"], "abc");
    assert_eq!(history[0]["title"], "Gatos en el parque");
    assert!(history[0]["timestamp"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_registrations_all_succeed() {
    let (base, _) = spawn_app().await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let base = base.clone();
        tasks.spawn(async move { register(&base, &format!("user{i}")).await.status() });
    }

    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::CREATED);
    }
}

#[tokio::test]
async fn history_requires_bearer() {
    let (base, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let missing = client.get(format!("{base}/api/users/history")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let invalid = client
        .get(format!("{base}/api/users/history"))
        .bearer_auth("not-a-session")
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    let body: Value = invalid.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn malformed_body_is_400() {
    let (base, _) = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/api/auth/register"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Client pipeline against the real server
// ============================================================================

#[derive(Default)]
struct RecordingNavigator {
    opened: std::sync::Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn open(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }

    fn notify(&self, _message: &str) {}
}

#[tokio::test]
async fn history_drives_the_search_term() {
    let (base, queries) = spawn_app().await;
    let token: Value = register(&base, "luis").await.json().await.unwrap();
    let credentials = Credentials::bearer(token["token"].as_str().unwrap()).unwrap();

    let api = HttpApi::new(format!("{base}/api").parse().unwrap());
    for title in ["Gatos en el parque", "Gatos jugando", "Perros corriendo"] {
        api.append_history(
            &credentials,
            &NewHistoryEntry {
                video_id: title.len().to_string(),
                title: title.into(),
            },
        )
        .await
        .unwrap();
    }

    let explorer = Explorer::new(
        api,
        RecordingNavigator::default(),
        Some(credentials.clone()),
        &KeywordConfig::default(),
    );

    let outcome = explorer
        .accept_location(Coordinate::new(10.0, 0.0).unwrap())
        .await;
    assert_eq!(outcome, FetchOutcome::Applied);
    assert_eq!(explorer.preferred_keyword(), "gatos");
    assert_eq!(queries.lock().await.as_slice(), ["gatos videos Oaxaca de Juárez"]);

    let view = explorer.view();
    assert_eq!(view.place_label, "Oaxaca de Juárez");
    assert_eq!(view.videos.len(), 2);

    // open the unrestricted one, which lands in the server-side history
    explorer.click_video(&view.videos[0]).await;
    let history = explorer.api().history(&credentials).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].video_id, "ok1");
}
