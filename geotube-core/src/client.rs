//! # Backend API Client
//!
//! The client's view of the GeoTube backend. [`ExploreApi`] is the seam the
//! explore pipeline is written against; [`HttpApi`] is the reqwest
//! implementation used by the terminal client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::coordinate::Coordinate;
use crate::models::{Credentials, HistoryEntry, NewHistoryEntry, PlaceName, VideoResult};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API base URL: {0}")]
    Url(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Query sent to `GET /api/videos/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_term: String,
    pub location: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
    pub location_name: PlaceName,
}

/// `{message}` body carried by every backend error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[async_trait]
pub trait ExploreApi: Send + Sync {
    async fn geocode(&self, coord: Coordinate) -> Result<PlaceName, ApiError>;

    async fn search_videos(&self, request: &SearchRequest) -> Result<Vec<VideoResult>, ApiError>;

    async fn history(&self, credentials: &Credentials) -> Result<Vec<HistoryEntry>, ApiError>;

    async fn append_history(
        &self,
        credentials: &Credentials,
        entry: &NewHistoryEntry,
    ) -> Result<HistoryEntry, ApiError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    /// `base` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Url(self.base.to_string()))?;
            segments.pop_if_empty().extend(path.split('/'));
        }
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(ApiError::Status { status, message });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExploreApi for HttpApi {
    async fn geocode(&self, coord: Coordinate) -> Result<PlaceName, ApiError> {
        let response = self
            .client
            .get(self.endpoint("location/geocode")?)
            .query(&[("lat", coord.latitude), ("lon", coord.longitude)])
            .send()
            .await?;

        let body: GeocodeResponse = Self::decode(response).await?;
        debug!("Geocoded {:?} to {}", coord, body.location_name);
        Ok(body.location_name)
    }

    async fn search_videos(&self, request: &SearchRequest) -> Result<Vec<VideoResult>, ApiError> {
        let response = self
            .client
            .get(self.endpoint("videos/search")?)
            .query(request)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn history(&self, credentials: &Credentials) -> Result<Vec<HistoryEntry>, ApiError> {
        let response = self
            .client
            .get(self.endpoint("users/history")?)
            .bearer_auth(credentials.token())
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn append_history(
        &self,
        credentials: &Credentials,
        entry: &NewHistoryEntry,
    ) -> Result<HistoryEntry, ApiError> {
        let response = self
            .client
            .post(self.endpoint("users/history")?)
            .bearer_auth(credentials.token())
            .json(entry)
            .send()
            .await?;

        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn stub(app: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Url::parse(&format!("http://{}/api/", addr)).unwrap()
    }

    #[test]
    fn endpoint_joins_below_base() {
        let api = HttpApi::new(Url::parse("http://localhost:5000/api").unwrap());
        assert_eq!(
            api.endpoint("location/geocode").unwrap().as_str(),
            "http://localhost:5000/api/location/geocode"
        );

        let api = HttpApi::new(Url::parse("http://localhost:5000/api/").unwrap());
        assert_eq!(
            api.endpoint("users/history").unwrap().as_str(),
            "http://localhost:5000/api/users/history"
        );
    }

    #[tokio::test]
    async fn geocode_and_search_round_trip() {
        let app = Router::new()
            .route(
                "/api/location/geocode",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(q["lat"], "19.4326");
                    Json(json!({ "locationName": "Ciudad de México" }))
                }),
            )
            .route(
                "/api/videos/search",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!([{
                        "id": "v1",
                        "title": q["searchTerm"],
                        "channelTitle": q["location"],
                        "thumbnail": "",
                        "ageRestricted": q["maxResults"] != "15"
                    }]))
                }),
            );

        let api = HttpApi::new(stub(app).await);
        let place = api.geocode(Coordinate::FALLBACK).await.unwrap();
        assert_eq!(place.as_str(), "Ciudad de México");

        let videos = api
            .search_videos(&SearchRequest {
                search_term: "gatos videos".into(),
                location: place.to_string(),
                max_results: 15,
            })
            .await
            .unwrap();
        assert_eq!(videos[0].title, "gatos videos");
        assert_eq!(videos[0].channel_title, "Ciudad de México");
        assert!(!videos[0].age_restricted);
    }

    #[tokio::test]
    async fn history_sends_bearer_and_surfaces_errors() {
        let app = Router::new().route(
            "/api/users/history",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("Bearer good") => (
                        StatusCode::OK,
                        Json::<Value>(json!([{
                            "videoId": "v1", "title": "Gatos", "timestamp": "2025-01-01T00:00:00Z"
                        }])),
                    ),
                    _ => (
                        StatusCode::UNAUTHORIZED,
                        Json::<Value>(json!({ "message": "Invalid or expired session" })),
                    ),
                }
            }),
        );

        let api = HttpApi::new(stub(app).await);

        let history = api.history(&Credentials::bearer("good").unwrap()).await.unwrap();
        assert_eq!(history[0].title, "Gatos");

        match api.history(&Credentials::bearer("bad").unwrap()).await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Invalid or expired session");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
