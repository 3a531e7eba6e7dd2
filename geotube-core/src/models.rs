//! Shared data types exchanged between the backend, the providers and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Place Name
// ============================================================================

/// A human-readable place (city, region or country). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaceName(String);

impl PlaceName {
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlaceName {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PlaceName::new(value).ok_or("place name must not be empty")
    }
}

impl From<PlaceName> for String {
    fn from(value: PlaceName) -> Self {
        value.0
    }
}

impl fmt::Display for PlaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Videos
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub age_restricted: bool,
}

impl VideoResult {
    pub fn watch_url(&self) -> String {
        watch_url(&self.id)
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of a history append request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryEntry {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
}

impl From<&VideoResult> for NewHistoryEntry {
    fn from(video: &VideoResult) -> Self {
        Self {
            video_id: video.id.clone(),
            title: video.title.clone(),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Bearer credential for authenticated calls, passed explicitly to each call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self { token })
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}
