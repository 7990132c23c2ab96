use axum::routing::{get, post};
use axum::Router;

use crate::handlers::baa;
use crate::state::AppState;

/// Routes mounted at `/admin/baa-templates` (admin only).
///
/// ```text
/// GET    /              -> list_templates
/// POST   /              -> create_template
/// GET    /{id}          -> get_template
/// PUT    /{id}          -> update_template
/// DELETE /{id}          -> delete_template
/// POST   /{id}/render   -> render_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(baa::list_templates).post(baa::create_template))
        .route(
            "/{id}",
            get(baa::get_template)
                .put(baa::update_template)
                .delete(baa::delete_template),
        )
        .route("/{id}/render", post(baa::render_template))
}
