use std::sync::Arc;

use anyhow::{Context, Result};
use geotube_core::{geocode::NominatimClient, store::Store, youtube::YouTubeClient};
use tracing::warn;

use super::config::Config;

pub struct AppState {
    pub config: Config,
    pub geocoder: NominatimClient,
    pub youtube: YouTubeClient,
    pub store: Store,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let store = Store::open(&config.database_path).with_context(|| {
            format!("Failed to open database at {}", config.database_path.display())
        })?;

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> Result<Arc<Self>> {
        let geocoder = NominatimClient::new(config.geocoder.clone())
            .context("Failed to build geocoding client")?;

        let youtube = YouTubeClient::new(config.youtube.clone());
        if !youtube.is_configured() {
            warn!("No YouTube API key configured, /api/videos/search will fail");
        }

        Ok(Arc::new(Self {
            config,
            geocoder,
            youtube,
            store,
        }))
    }
}
