use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use geotube_core::{
    geocode::{self, GeocoderConfig},
    store::Store,
    youtube::{self, YouTubeConfig},
};
use tracing::warn;

pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub geocoder: GeocoderConfig,
    pub youtube: YouTubeConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let database_path = var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(Store::default_path);

        Ok(Self {
            port: try_load("PORT", "5000")?,
            database_path,
            geocoder: GeocoderConfig {
                url: load_or("GEOCODER_URL", geocode::NOMINATIM_URL),
                user_agent: load_or("GEOCODER_USER_AGENT", geocode::DEFAULT_USER_AGENT),
                language: load_or("GEOCODER_LANGUAGE", geocode::DEFAULT_LANGUAGE),
                fallback: load_or("GEOCODE_FALLBACK", geocode::DEFAULT_FALLBACK),
            },
            youtube: YouTubeConfig {
                api_url: load_or("YOUTUBE_API_URL", youtube::YOUTUBE_API_URL),
                api_key: var("YOUTUBE_API_KEY").or_else(|| read_secret("YOUTUBE_API_KEY")),
            },
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| {
        warn!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    load_or(key, default).parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Environment misconfigured: {key}: {e}")
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
}
