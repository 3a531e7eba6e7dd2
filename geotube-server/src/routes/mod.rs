pub mod auth;
pub mod location;
pub mod users;
pub mod videos;

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Query,
    },
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use geotube_core::store::{Store, StoreError, User};
use tracing::error;

use crate::{error::AppError, state::AppState};

pub async fn root_handler() -> &'static str {
    "GeoTube API running"
}

/// User resolved from an `Authorization: Bearer <token>` header.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::MissingToken)?
            .to_string();

        let user = with_store(state, move |store| store.authenticate(&token)).await?;
        Ok(AuthUser(user))
    }
}

/// Unwrap a JSON body, turning axum's rejection into a `{message}` 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Same as [`json_body`] for query strings, e.g. a repeated key.
fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Run a store operation on the blocking pool. SQLite I/O and password
/// hashing stay off the async workers.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| {
            error!("Store task failed: {e}");
            AppError::Internal("Internal server error".into())
        })?
        .map_err(AppError::from)
}
