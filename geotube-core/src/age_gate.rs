//! Age gate for opening videos.
//!
//! ```text
//! Idle --click--> DirectOpen                 (not age restricted)
//! Idle --click--> Pending --confirm(adult)--> Confirmed
//!                 Pending --confirm(minor)--> Rejected
//!                 Pending --cancel----------> Cancelled
//! ```
//!
//! The gate only decides. Recording history and navigating happen in the
//! caller, and only for [`GateDecision::Open`].

use crate::models::VideoResult;

/// Blocking notice shown when a minor confirms an age-restricted video.
pub const AGE_REJECTION_NOTICE: &str = "No puedes ver este video si no eres mayor de edad.";

/// Where opened videos and blocking notices go.
pub trait Navigator: Send + Sync {
    /// Open `url` in a new browsing context.
    fn open(&self, url: &str);

    /// Show a blocking notice outside the rendered view.
    fn notify(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Record in history, then navigate.
    Open(VideoResult),
    /// Waiting for the user to confirm their age.
    AwaitConfirmation(VideoResult),
    /// Confirmed but not an adult.
    Rejected(VideoResult),
    /// Pending video dropped without side effects.
    Cancelled(VideoResult),
    /// Nothing was pending.
    Idle,
}

#[derive(Debug, Default)]
pub struct AgeGate {
    pending: Option<VideoResult>,
}

impl AgeGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&VideoResult> {
        self.pending.as_ref()
    }

    /// A restricted video replaces whatever was pending before.
    pub fn click(&mut self, video: VideoResult) -> GateDecision {
        if video.age_restricted {
            self.pending = Some(video.clone());
            GateDecision::AwaitConfirmation(video)
        } else {
            GateDecision::Open(video)
        }
    }

    pub fn confirm(&mut self, is_adult: bool) -> GateDecision {
        match self.pending.take() {
            Some(video) if is_adult => GateDecision::Open(video),
            Some(video) => GateDecision::Rejected(video),
            None => GateDecision::Idle,
        }
    }

    pub fn cancel(&mut self) -> GateDecision {
        self.pending
            .take()
            .map(GateDecision::Cancelled)
            .unwrap_or(GateDecision::Idle)
    }
}
