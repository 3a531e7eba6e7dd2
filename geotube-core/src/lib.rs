//! # GeoTube Core
//!
//! Location-aware video discovery: reverse geocoding, history-driven keyword
//! extraction, video search and the client-side explore pipeline.

// ============================================================================
// Domain Types
// ============================================================================
pub mod coordinate;
pub mod models;

// ============================================================================
// Providers (reverse geocoding / video search)
// ============================================================================
pub mod geocode;
pub mod youtube;

// ============================================================================
// Accounts & History
// ============================================================================
pub mod store;

// ============================================================================
// Client
// ============================================================================
pub mod keywords;
pub mod client;
pub mod explore;
pub mod age_gate;

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use coordinate::{Coordinate, CoordinateError};
pub use models::{Credentials, HistoryEntry, PlaceName, VideoResult};
