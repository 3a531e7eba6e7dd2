use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{json_body, with_store};
use crate::{error::AppError, state::AppState};

#[derive(Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    token: String,
    username: String,
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let body = json_body(payload)?;
    let session =
        with_store(&state, move |store| store.register(&body.username, &body.password)).await?;

    info!("Registered {}", session.user.username);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            username: session.user.username,
        }),
    ))
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let body = json_body(payload)?;
    let session =
        with_store(&state, move |store| store.login(&body.username, &body.password)).await?;

    Ok(Json(AuthResponse {
        token: session.token,
        username: session.user.username,
    }))
}
