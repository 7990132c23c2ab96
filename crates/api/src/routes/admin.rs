//! Route definitions for the `/admin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{privacy, users};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /users                          -> list_users
/// POST   /users                          -> create_user
/// GET    /users/{id}                     -> get_user
/// PUT    /users/{id}                     -> update_user
/// DELETE /users/{id}                     -> deactivate_user
/// POST   /users/{id}/reset-password      -> reset_password
/// GET    /deletion-requests              -> list_requests
/// POST   /deletion-requests/{id}/process -> process_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route("/users/{id}/reset-password", post(users::reset_password))
        .route("/deletion-requests", get(privacy::list_requests))
        .route(
            "/deletion-requests/{id}/process",
            post(privacy::process_request),
        )
}
