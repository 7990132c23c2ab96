use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::privacy;
use crate::state::AppState;

/// Routes mounted at `/privacy` (requires auth).
///
/// ```text
/// GET    /deletion-requests        -> list_my_requests
/// POST   /deletion-requests        -> create_request
/// DELETE /deletion-requests/{id}   -> cancel_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/deletion-requests",
            get(privacy::list_my_requests).post(privacy::create_request),
        )
        .route("/deletion-requests/{id}", delete(privacy::cancel_request))
}
