//! Author suggestion endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use authornet_ingestion::pipeline::suggest_authors;
use authornet_ingestion::request::SuggestRequest;

use crate::sse::profile_sse;
use crate::state::SharedState;

/// `POST /api/suggest`. Input is validated before any upstream query is made;
/// a rejected request gets `400 {"error": ...}`.
pub async fn api_suggest(State(state): State<SharedState>, body: String) -> Response {
    let plan = match SuggestRequest::from_json(&body).and_then(|req| req.normalize(&state.defaults)) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(error = %e, "Rejected suggestion request");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };

    info!(names = ?plan.author_names, "Starting suggestion stream");
    let profiles = suggest_authors(state.index.clone(), plan, state.gender.clone());
    profile_sse(profiles).into_response()
}
