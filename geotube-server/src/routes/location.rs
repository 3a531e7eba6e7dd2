use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use geotube_core::{client::GeocodeResponse, Coordinate};
use serde::Deserialize;
use tracing::error;

use super::query_params;
use crate::{error::AppError, state::AppState};

/// Raw query values; parsed by hand so missing and malformed input get
/// distinct messages.
#[derive(Deserialize)]
pub struct GeocodeParams {
    lat: Option<String>,
    lon: Option<String>,
}

pub async fn geocode_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<GeocodeParams>, QueryRejection>,
) -> Result<Json<GeocodeResponse>, AppError> {
    let params = query_params(params)?;
    let coord = Coordinate::parse(params.lat.as_deref(), params.lon.as_deref())?;

    let place = state.geocoder.locate(coord).await.map_err(|e| {
        error!("Geocode endpoint failed: {e}");
        AppError::Internal("Server error while resolving the location name".into())
    })?;

    let place =
        place.ok_or_else(|| AppError::NotFound("Could not determine the location".into()))?;

    Ok(Json(GeocodeResponse {
        location_name: place,
    }))
}
