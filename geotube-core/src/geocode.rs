//! # Reverse Geocoding
//!
//! Resolves a [`Coordinate`] to a single [`PlaceName`] through a
//! Nominatim-compatible provider.
//!
//! ## Resolution policy
//!
//! The first non-blank field wins:
//! city → town → village → state → county → country → fallback sentinel.
//!
//! Provider failures are logged and masked behind the sentinel. Only a request
//! that cannot be constructed at all is reported to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::coordinate::Coordinate;
use crate::models::PlaceName;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = "GeoTubeApp/1.0";
pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_FALLBACK: &str = "Mundo";

/// Zoom level 10 resolves to city granularity.
const ZOOM: u8 = 10;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Failed to build geocoding request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Geocoding request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Geocoding provider returned {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to decode geocoding response: {0}")]
    Decode(#[source] reqwest::Error),
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    pub language: String,
    /// Sentinel returned when no name can be resolved.
    pub fallback: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }
}

// ============================================================================
// Address
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Most specific non-blank name in the address.
    pub fn place_name(&self) -> Option<PlaceName> {
        [
            &self.city,
            &self.town,
            &self.village,
            &self.state,
            &self.county,
            &self.country,
        ]
        .into_iter()
        .flatten()
        .find_map(|name| PlaceName::new(name.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

// ============================================================================
// Provider
// ============================================================================

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Raw address details for a coordinate, `None` when the provider has none.
    async fn reverse(&self, coord: Coordinate) -> Result<Option<Address>, GeocodeError>;
}

pub struct NominatimClient {
    client: reqwest::Client,
    config: GeocoderConfig,
}

impl NominatimClient {
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(GeocodeError::Request)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    /// Resolve a coordinate using this client's fallback sentinel.
    pub async fn locate(&self, coord: Coordinate) -> Result<Option<PlaceName>, GeocodeError> {
        resolve_place(self, coord, &self.config.fallback).await
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, coord: Coordinate) -> Result<Option<Address>, GeocodeError> {
        let request = self
            .client
            .get(&self.config.url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", coord.latitude.to_string()),
                ("lon", coord.longitude.to_string()),
                ("zoom", ZOOM.to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", self.config.language.clone()),
            ])
            .build()
            .map_err(GeocodeError::Request)?;

        debug!("Reverse geocoding {}", request.url());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(GeocodeError::Transport)?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let body: ReverseResponse = response.json().await.map_err(GeocodeError::Decode)?;
        Ok(body.address)
    }
}

/// Apply the resolution policy on top of any [`ReverseGeocoder`].
///
/// Returns `Ok(None)` only when nothing resolves and `fallback` is blank.
pub async fn resolve_place<G>(
    geocoder: &G,
    coord: Coordinate,
    fallback: &str,
) -> Result<Option<PlaceName>, GeocodeError>
where
    G: ReverseGeocoder + ?Sized,
{
    let address = match geocoder.reverse(coord).await {
        Ok(address) => address,
        Err(e @ GeocodeError::Request(_)) => return Err(e),
        Err(e) => {
            warn!("Reverse geocoding failed for {:?}: {}", coord, e);
            None
        }
    };

    Ok(address
        .as_ref()
        .and_then(Address::place_name)
        .or_else(|| PlaceName::new(fallback)))
}
