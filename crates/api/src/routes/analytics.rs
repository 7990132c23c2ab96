use axum::routing::{get, post};
use axum::Router;

use crate::handlers::analytics;
use crate::state::AppState;

/// Routes mounted at `/analytics`.
///
/// ```text
/// POST /events   -> track_event (requires auth)
/// GET  /summary  -> summary (clinician)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(analytics::track_event))
        .route("/summary", get(analytics::summary))
}
