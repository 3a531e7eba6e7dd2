use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use geotube_core::{models::NewHistoryEntry, HistoryEntry};

use super::{json_body, with_store, AuthUser};
use crate::{error::AppError, state::AppState};

pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let history = with_store(&state, move |store| store.history(&user.id)).await?;
    Ok(Json(history))
}

pub async fn append_history_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<NewHistoryEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<HistoryEntry>), AppError> {
    let entry = json_body(payload)?;
    let recorded =
        with_store(&state, move |store| store.append_history(&user.id, &entry)).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}
