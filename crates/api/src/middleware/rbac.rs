//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects callers whose role does
//! not qualify with 403 Forbidden, logging the denial.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use empathy_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

fn deny(user: &AuthUser, parts: &Parts, required: &str) -> AppError {
    tracing::warn!(
        user_id = user.user_id,
        role = %user.role,
        path = %parts.uri.path(),
        required,
        "Authorization denied",
    );
    AppError::Core(CoreError::Forbidden(format!("{required} role required")))
}

/// Requires the `admin` role.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(admin): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(deny(&user, parts, "Admin"));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires `therapist` or `admin`.
pub struct RequireClinician(pub AuthUser);

impl FromRequestParts<AppState> for RequireClinician {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_clinician() {
            return Err(deny(&user, parts, "Therapist or Admin"));
        }
        Ok(RequireClinician(user))
    }
}

/// Any authenticated user. Same as [`AuthUser`], named for route intent.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}
