pub mod admin;
pub mod ai;
pub mod analytics;
pub mod audit;
pub mod auth;
pub mod baa;
pub mod conversations;
pub mod goals;
pub mod health;
pub mod privacy;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register, /auth/login, /auth/refresh       public, rate limited
/// /auth/logout, /auth/me                           requires auth, rate limited
///
/// /admin/users                                     list, create (admin only)
/// /admin/users/{id}                                get, update, deactivate
/// /admin/users/{id}/reset-password                 reset password
/// /admin/deletion-requests                         list (admin only)
/// /admin/deletion-requests/{id}/process            approve or reject
/// /admin/audit-logs                                query (admin only)
/// /admin/audit-logs/export                         CSV or JSON export
/// /admin/audit-logs/integrity-check                hash chain verification
/// /admin/audit-logs/retention[/{category}]         retention policies
/// /admin/baa-templates[/{id}[/render]]             BAA template CRUD, render
///
/// /conversations[/{id}[/messages]]                 caller's conversations
/// /goals[/{id}]                                    therapy goals
/// /analytics/events, /analytics/summary            event ingestion, summary
/// /privacy/deletion-requests[/{id}]                caller's deletion requests
/// /ai/emotions/analyze, /ai/bias/analyze           AI delegates, rate limited
///
/// /features                                        public feature flags
/// ```
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/admin", admin::router())
        .nest("/admin/audit-logs", audit::router())
        .nest("/admin/baa-templates", baa::router())
        .nest("/conversations", conversations::router())
        .nest("/goals", goals::router())
        .nest("/analytics", analytics::router())
        .nest("/privacy", privacy::router())
        .nest("/ai", ai::router(state))
        .route("/features", get(handlers::features::list_features))
}
