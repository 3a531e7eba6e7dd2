//! # Explore Session
//!
//! Client-side orchestration: location → place name → keyword → video list,
//! plus the age-gated open flow that feeds the viewing history.
//!
//! ## Racing fetches
//!
//! Map moves start new fetches without cancelling the ones in flight. Every
//! fetch takes a generation number and may only write to the view while its
//! generation is the latest issued, so a slow stale response can never
//! overwrite a newer one.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

use crate::age_gate::{AgeGate, GateDecision, Navigator, AGE_REJECTION_NOTICE};
use crate::client::{ExploreApi, SearchRequest};
use crate::coordinate::Coordinate;
use crate::keywords::{KeywordConfig, KeywordExtractor};
use crate::models::{Credentials, NewHistoryEntry, VideoResult};

pub const MAX_RESULTS: u32 = 15;
pub const FETCH_ERROR_MESSAGE: &str = "No se pudieron cargar los videos para esta ubicación.";
pub const INITIAL_PLACE_LABEL: &str = "tu ubicación";

/// Search term for a preferred keyword; empty means no preference.
pub fn search_term(keyword: &str) -> String {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        "videos".to_string()
    } else {
        format!("{} videos", keyword)
    }
}

// ============================================================================
// View State
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub place_label: String,
    pub videos: Vec<VideoResult>,
    pub error: Option<String>,
    pub loading: bool,
    pub map_center: Option<Coordinate>,
    /// Generation of the fetch that last wrote to this view.
    pub generation: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            place_label: INITIAL_PLACE_LABEL.to_string(),
            videos: Vec::new(),
            error: None,
            loading: false,
            map_center: None,
            generation: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The video list was committed.
    Applied,
    /// The fetch failed and the list was cleared.
    Failed,
    /// A newer fetch was issued; nothing from this one reached the view.
    Stale,
}

// ============================================================================
// Explorer
// ============================================================================

pub struct Explorer<A, N> {
    api: A,
    navigator: N,
    credentials: Option<Credentials>,
    extractor: KeywordExtractor,
    keyword: Mutex<String>,
    view: Mutex<ViewState>,
    generation: AtomicU64,
    gate: Mutex<AgeGate>,
}

impl<A: ExploreApi, N: Navigator> Explorer<A, N> {
    pub fn new(
        api: A,
        navigator: N,
        credentials: Option<Credentials>,
        keywords: &KeywordConfig,
    ) -> Self {
        Self {
            api,
            navigator,
            credentials,
            extractor: keywords.extractor(),
            keyword: Mutex::new(String::new()),
            view: Mutex::new(ViewState::default()),
            generation: AtomicU64::new(0),
            gate: Mutex::new(AgeGate::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn view(&self) -> ViewState {
        self.view.lock().clone()
    }

    pub fn preferred_keyword(&self) -> String {
        self.keyword.lock().clone()
    }

    pub fn pending_video(&self) -> Option<VideoResult> {
        self.gate.lock().pending().cloned()
    }

    // ========================================================================
    // Keyword
    // ========================================================================

    /// Preferred keyword from the user's history. Never fails: without
    /// credentials, history or signal the result is `""`.
    pub async fn derive_keyword(&self) -> String {
        let Some(credentials) = &self.credentials else {
            return String::new();
        };

        match self.api.history(credentials).await {
            Ok(history) => self.extractor.preferred_from_history(&history),
            Err(e) => {
                warn!("Could not fetch history for keyword preferences: {}", e);
                String::new()
            }
        }
    }

    /// Derive the keyword and cache it.
    pub async fn refresh_keyword(&self) -> String {
        let keyword = self.derive_keyword().await;
        *self.keyword.lock() = keyword.clone();
        keyword
    }

    async fn keyword_or_derive(&self) -> String {
        let cached = self.preferred_keyword();
        if cached.is_empty() {
            self.refresh_keyword().await
        } else {
            cached
        }
    }

    // ========================================================================
    // Location
    // ========================================================================

    pub async fn accept_location(&self, coord: Coordinate) -> FetchOutcome {
        self.view.lock().map_center = Some(coord);
        let keyword = self.keyword_or_derive().await;
        self.fetch(coord, &keyword).await
    }

    /// Centre on [`Coordinate::FALLBACK`] and fetch with the cached keyword.
    pub async fn deny_location(&self) -> FetchOutcome {
        let coord = Coordinate::FALLBACK;
        self.view.lock().map_center = Some(coord);
        let keyword = self.preferred_keyword();
        self.fetch(coord, &keyword).await
    }

    pub async fn move_map(&self, coord: Coordinate) -> FetchOutcome {
        self.view.lock().map_center = Some(coord);
        let keyword = self.keyword_or_derive().await;
        self.fetch(coord, &keyword).await
    }

    /// Resolve the place name, then search for videos there.
    ///
    /// A failure at either step clears the list and sets one error message.
    /// A place name committed before a failed search stays visible.
    pub async fn fetch(&self, coord: Coordinate, keyword: &str) -> FetchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.commit(generation, |view| {
            view.loading = true;
            view.error = None;
        });

        let place = match self.api.geocode(coord).await {
            Ok(place) => place,
            Err(e) => {
                error!("Geocoding failed for {:?}: {}", coord, e);
                return self.fail(generation);
            }
        };

        let place_label = place.to_string();
        self.commit(generation, |view| view.place_label = place_label);

        let request = SearchRequest {
            search_term: search_term(keyword),
            location: place.to_string(),
            max_results: MAX_RESULTS,
        };

        match self.api.search_videos(&request).await {
            Ok(videos) => {
                let count = videos.len();
                let applied = self.commit(generation, |view| {
                    view.videos = videos;
                    view.loading = false;
                });

                if applied {
                    info!("Loaded {} videos for {} ({:?})", count, place, request.search_term);
                    FetchOutcome::Applied
                } else {
                    FetchOutcome::Stale
                }
            }
            Err(e) => {
                error!("Video search failed for {}: {}", place, e);
                self.fail(generation)
            }
        }
    }

    fn fail(&self, generation: u64) -> FetchOutcome {
        let applied = self.commit(generation, |view| {
            view.videos.clear();
            view.error = Some(FETCH_ERROR_MESSAGE.to_string());
            view.loading = false;
        });

        if applied {
            FetchOutcome::Failed
        } else {
            FetchOutcome::Stale
        }
    }

    /// Apply `update` only if `generation` is still the latest issued.
    fn commit(&self, generation: u64, update: impl FnOnce(&mut ViewState)) -> bool {
        let mut view = self.view.lock();
        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            debug!("Discarding result of fetch {} (latest is {})", generation, latest);
            return false;
        }

        update(&mut view);
        view.generation = generation;
        true
    }

    // ========================================================================
    // Opening videos
    // ========================================================================

    pub async fn click_video(&self, video: &VideoResult) -> GateDecision {
        let decision = self.gate.lock().click(video.clone());
        self.apply(decision).await
    }

    pub async fn confirm_age(&self, is_adult: bool) -> GateDecision {
        let decision = self.gate.lock().confirm(is_adult);
        self.apply(decision).await
    }

    pub fn cancel_age(&self) -> GateDecision {
        self.gate.lock().cancel()
    }

    async fn apply(&self, decision: GateDecision) -> GateDecision {
        match &decision {
            GateDecision::Open(video) => self.record_and_open(video).await,
            GateDecision::Rejected(video) => {
                info!("Blocked age-restricted video {}", video.id);
                self.navigator.notify(AGE_REJECTION_NOTICE);
            }
            _ => {}
        }
        decision
    }

    /// Append to history (when signed in), then navigate.
    async fn record_and_open(&self, video: &VideoResult) {
        if let Some(credentials) = &self.credentials {
            if let Err(e) = self
                .api
                .append_history(credentials, &NewHistoryEntry::from(video))
                .await
            {
                warn!("Could not record {} in history: {}", video.id, e);
            }
        }

        self.navigator.open(&video.watch_url());
    }
}
