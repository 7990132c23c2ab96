//! Route definitions for the `/ai` resource.

use axum::middleware::from_fn_with_state;
use axum::routing::post;
use axum::Router;

use crate::handlers::ai;
use crate::middleware::rate_limit::limit_ai_requests;
use crate::state::AppState;

/// Routes mounted at `/ai`, behind the AI rate limiter.
///
/// ```text
/// POST /emotions/analyze -> analyze_emotions (requires auth)
/// POST /bias/analyze     -> analyze_bias (clinician, feature-gated)
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/emotions/analyze", post(ai::analyze_emotions))
        .route("/bias/analyze", post(ai::analyze_bias))
        .route_layer(from_fn_with_state(state.clone(), limit_ai_requests))
}
