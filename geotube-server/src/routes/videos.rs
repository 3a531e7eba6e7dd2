use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use geotube_core::{
    youtube::{SearchQuery, DEFAULT_MAX_RESULTS},
    VideoResult,
};
use serde::Deserialize;
use tracing::error;

use super::query_params;
use crate::{error::AppError, state::AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    search_term: Option<String>,
    location: Option<String>,
    max_results: Option<String>,
}

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<VideoResult>>, AppError> {
    let params = query_params(params)?;
    let max_results = match params.max_results.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_MAX_RESULTS,
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Validation("maxResults must be a positive integer".into()))?,
    };

    let query = SearchQuery::new(
        params.search_term.as_deref().unwrap_or_default(),
        params.location.as_deref().unwrap_or_default(),
        max_results,
    );

    let videos = state.youtube.search(&query).await.map_err(|e| {
        error!("Video search failed for {:?}: {e}", query.provider_query());
        AppError::Internal("Could not fetch videos".into())
    })?;

    Ok(Json(videos))
}
