//! # GeoTube Server
//!
//! HTTP backend for location-aware video discovery.
//!
//! ## Endpoints
//!
//! - `GET  /api/location/geocode?lat=&lon=` → `{locationName}`
//! - `GET  /api/videos/search?searchTerm=&location=&maxResults=` → `[VideoResult]`
//! - `POST /api/auth/register`, `POST /api/auth/login` → `{token, username}`
//! - `GET  /api/users/history`, `POST /api/users/history` (Bearer)
//!
//! Errors are `{message}` JSON. Provider failures are logged and never
//! forwarded to the client: geocoding falls back to a sentinel place name,
//! video search answers 500 with a generic message.
//!
//! ## Configuration
//!
//! Environment variables, all optional:
//! `PORT`, `DATABASE_PATH`, `GEOCODER_URL`, `GEOCODER_USER_AGENT`,
//! `GEOCODER_LANGUAGE`, `GEOCODE_FALLBACK`, `YOUTUBE_API_URL`,
//! `YOUTUBE_API_KEY` (or `/run/secrets/YOUTUBE_API_KEY`).
//!
//! ```sh
//! RUST_LOG=geotube_server=debug YOUTUBE_API_KEY=... geotube-server
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use config::Config;
use routes::{auth, location, root_handler, users, videos};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(root_handler))
        .route("/api/location/geocode", get(location::geocode_handler))
        .route("/api/videos/search", get(videos::search_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route(
            "/api/users/history",
            get(users::history_handler).post(users::append_history_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).inspect_err(|e| error!("{e:#}"))?;

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
