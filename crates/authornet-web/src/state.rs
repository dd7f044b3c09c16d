//! Shared application state for the web server.

use std::sync::Arc;

use authornet_ingestion::gender::GenderDetector;
use authornet_ingestion::request::SuggestDefaults;
use authornet_ingestion::sources::SearchIndex;

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<dyn SearchIndex>,
    /// Loaded once at startup and shared read-only by every run
    pub gender: Arc<dyn GenderDetector>,
    /// Applied to fields a request leaves out
    pub defaults: SuggestDefaults,
}

impl AppState {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        gender: Arc<dyn GenderDetector>,
        defaults: SuggestDefaults,
    ) -> Self {
        Self { index, gender, defaults }
    }
}

pub type SharedState = Arc<AppState>;
