//! # Video Search
//!
//! YouTube Data API v3 client used by the backend search proxy.
//!
//! A search is two calls: `search` for matching video ids and snippets, then
//! `videos?part=contentDetails` to learn which of them are age restricted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::models::VideoResult;

pub const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_MAX_RESULTS: u32 = 15;
pub const MAX_RESULTS_LIMIT: u32 = 50;
pub const DEFAULT_SEARCH_TERM: &str = "videos";

const AGE_RESTRICTED_RATING: &str = "ytAgeRestricted";

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("YouTube API key not configured")]
    NotConfigured,
    #[error("YouTube request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("YouTube API error {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to decode YouTube response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_url: YOUTUBE_API_URL.to_string(),
            api_key: None,
        }
    }
}

/// One video search as requested by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub search_term: String,
    pub location: String,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn new(search_term: &str, location: &str, max_results: u32) -> Self {
        let search_term = search_term.trim();
        Self {
            search_term: if search_term.is_empty() {
                DEFAULT_SEARCH_TERM.to_string()
            } else {
                search_term.to_string()
            },
            location: location.trim().to_string(),
            max_results: max_results.clamp(1, MAX_RESULTS_LIMIT),
        }
    }

    /// Free-text query sent to the provider: the term, then the place.
    pub fn provider_query(&self) -> String {
        if self.location.is_empty() {
            self.search_term.clone()
        } else {
            format!("{} {}", self.search_term, self.location)
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Option<Snippet>,
}

#[derive(Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Deserialize)]
struct ContentDetails {
    #[serde(rename = "contentRating", default)]
    content_rating: ContentRating,
}

#[derive(Deserialize, Default)]
struct ContentRating {
    #[serde(rename = "ytRating")]
    yt_rating: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct YouTubeClient {
    client: reqwest::Client,
    config: YouTubeConfig,
}

impl YouTubeClient {
    pub fn new(config: YouTubeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref().filter(|k| !k.is_empty())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<VideoResult>, YouTubeError> {
        let api_key = self.api_key().ok_or(YouTubeError::NotConfigured)?;
        let q = query.provider_query();
        let max_results = query.max_results.to_string();

        debug!("YouTube search q={:?} max={}", q, query.max_results);

        let response = self
            .client
            .get(self.endpoint("search"))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", q.as_str()),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(YouTubeError::Transport)?;

        if !response.status().is_success() {
            return Err(YouTubeError::Status(response.status()));
        }

        let data: SearchResponse = response.json().await.map_err(YouTubeError::Decode)?;

        let mut videos: Vec<VideoResult> = data
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                let snippet = item.snippet?;
                let thumbnail = snippet
                    .thumbnails
                    .medium
                    .or(snippet.thumbnails.default)
                    .map(|t| t.url)
                    .unwrap_or_else(|| fallback_thumbnail(&id));

                Some(VideoResult {
                    id,
                    title: snippet.title,
                    channel_title: snippet.channel_title,
                    thumbnail,
                    age_restricted: false,
                })
            })
            .collect();

        if videos.is_empty() {
            return Ok(videos);
        }

        let restricted = self.age_restricted_ids(&videos, api_key).await?;
        for video in &mut videos {
            video.age_restricted = restricted.contains(&video.id);
        }

        Ok(videos)
    }

    async fn age_restricted_ids(
        &self,
        videos: &[VideoResult],
        api_key: &str,
    ) -> Result<HashSet<String>, YouTubeError> {
        let ids = videos
            .iter()
            .map(|v| v.id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(self.endpoint("videos"))
            .query(&[("part", "contentDetails"), ("id", ids.as_str()), ("key", api_key)])
            .send()
            .await
            .map_err(YouTubeError::Transport)?;

        if !response.status().is_success() {
            return Err(YouTubeError::Status(response.status()));
        }

        let data: VideosResponse = response.json().await.map_err(YouTubeError::Decode)?;

        Ok(data
            .items
            .into_iter()
            .filter(|item| {
                item.content_details
                    .as_ref()
                    .and_then(|d| d.content_rating.yt_rating.as_deref())
                    == Some(AGE_RESTRICTED_RATING)
            })
            .map(|item| item.id)
            .collect())
    }
}

fn fallback_thumbnail(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", video_id)
}
