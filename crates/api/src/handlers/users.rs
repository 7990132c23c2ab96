//! Handlers for `/admin/users` (user management).
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use empathy_core::audit::action_types;
use empathy_core::error::CoreError;
use empathy_core::types::DbId;
use empathy_core::validation::validate_username;
use empathy_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use empathy_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub password: String,
    pub role_id: DbId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub role_id: Option<DbId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    validate_username(&input.username).map_err(CoreError::Validation)?;
    validate_password_strength(&input.password).map_err(CoreError::Validation)?;
    ensure_role_exists(&state, input.role_id).await?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username,
            email: input.email.trim().to_lowercase(),
            password_hash: hashed,
            role_id: input.role_id,
        },
    )
    .await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_CREATE)
                .actor(admin.user_id)
                .entity("user", user.id)
                .details(json!({ "role_id": user.role_id }))
                .meta(&meta),
        )
        .await;

    let response = user_to_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let (limit, offset) = params.resolve();
    let users = UserRepo::list(&state.pool, limit, offset).await?;

    // One roles query instead of one per user.
    let roles = RoleRepo::list(&state.pool).await?;

    let data = users
        .iter()
        .map(|u| {
            let role = roles
                .iter()
                .find(|r| r.id == u.role_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            UserResponse::from_user(u, role)
        })
        .collect();

    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "User", id })?;
    let response = user_to_response(&state, &user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// PUT /api/v1/admin/users/{id}
///
/// Profile fields only; passwords go through `reset-password`.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if id == admin.user_id && input.is_active == Some(false) {
        return Err(CoreError::Conflict("Admins cannot deactivate their own account".into()).into());
    }
    if let Some(username) = &input.username {
        validate_username(username).map_err(CoreError::Validation)?;
    }
    if let Some(role_id) = input.role_id {
        ensure_role_exists(&state, role_id).await?;
    }

    let changed: Vec<&str> = [
        input.username.as_ref().map(|_| "username"),
        input.email.as_ref().map(|_| "email"),
        input.role_id.map(|_| "role_id"),
        input.is_active.map(|_| "is_active"),
    ]
    .into_iter()
    .flatten()
    .collect();

    let user = UserRepo::update(
        &state.pool,
        id,
        &UpdateUser {
            username: input.username,
            email: input.email.map(|e| e.trim().to_lowercase()),
            role_id: input.role_id,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or(CoreError::NotFound { entity: "User", id })?;

    if !user.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_UPDATE)
                .actor(admin.user_id)
                .entity("user", id)
                .details(json!({ "fields": changed }))
                .meta(&meta),
        )
        .await;

    let response = user_to_response(&state, &user).await?;
    Ok(Json(DataResponse { data: response }))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft-deactivate and revoke every session. Returns 204 No Content.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(CoreError::Conflict("Admins cannot deactivate their own account".into()).into());
    }

    if !UserRepo::deactivate(&state.pool, id).await? {
        // Already inactive is fine; absent is not.
        UserRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })?;
    }
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_DELETE)
                .actor(admin.user_id)
                .entity("user", id)
                .details(json!({ "sessions_revoked": revoked }))
                .meta(&meta),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/users/{id}/reset-password
///
/// Sets a new password, clears any lockout and ends existing sessions.
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.new_password).map_err(|m| {
        CoreError::Validation(m.replacen("password", "new_password", 1))
    })?;

    let hashed = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    if !UserRepo::update_password(&state.pool, id, &hashed).await? {
        return Err(CoreError::NotFound { entity: "User", id }.into());
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::PASSWORD_RESET)
                .actor(admin.user_id)
                .entity("user", id)
                .meta(&meta),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_role_exists(state: &AppState, role_id: DbId) -> AppResult<()> {
    if RoleRepo::find_by_id(&state.pool, role_id).await?.is_none() {
        return Err(CoreError::Validation(format!("role_id: role {role_id} does not exist")).into());
    }
    Ok(())
}

async fn user_to_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(UserResponse::from_user(user, role))
}
