//! Handlers for the `/auth` resource (register, login, refresh, logout, me).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use empathy_core::audit::action_types;
use empathy_core::error::CoreError;
use empathy_core::roles::PATIENT_ROLE_ID;
use empathy_core::validation::validate_username;
use empathy_db::models::session::CreateSession;
use empathy_db::models::user::{CreateUser, User, UserResponse};
use empathy_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 12, max = 128, message = "must be between 12 and 128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub refresh_token: String,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Public self-registration. New accounts are always patients.
pub async fn register(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    validate_username(&input.username).map_err(CoreError::Validation)?;
    validate_password_strength(&input.password).map_err(CoreError::Validation)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username,
            email: input.email.trim().to_lowercase(),
            password_hash,
            role_id: PATIENT_ROLE_ID,
        },
    )
    .await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::REGISTER)
                .actor(user.id)
                .entity("user", user.id)
                .meta(&meta),
        )
        .await;

    tracing::info!(user_id = user.id, "User registered");
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from_user(&user, role),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Unknown users and wrong passwords get the same 401. Deactivated or
/// locked accounts get 403. The fifth consecutive failure locks the account
/// for [`LOCK_DURATION_MINS`].
pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let Some(user) = UserRepo::find_by_username(&state.pool, &input.username).await? else {
        state
            .audit
            .record(
                AuditEvent::new(action_types::LOGIN_FAILED)
                    .failure()
                    .entity_type("user")
                    .details(json!({ "username": input.username, "reason": "unknown_user" }))
                    .meta(&meta),
            )
            .await;
        return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
    };

    if !user.is_active {
        record_denied_login(&state, &user, &meta, "deactivated").await;
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }

    if user.locked_until.is_some_and(|until| until > Utc::now()) {
        record_denied_login(&state, &user, &meta, "locked").await;
        return Err(CoreError::Forbidden(
            "Account is temporarily locked. Try again later.".into(),
        )
        .into());
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let failures = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        state
            .audit
            .record(
                AuditEvent::new(action_types::LOGIN_FAILED)
                    .failure()
                    .actor(user.id)
                    .entity("user", user.id)
                    .details(json!({ "reason": "bad_password", "failed_attempts": failures }))
                    .meta(&meta),
            )
            .await;

        if failures >= MAX_FAILED_ATTEMPTS {
            let until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
            state
                .audit
                .record(
                    AuditEvent::new(action_types::ACCOUNT_LOCKED)
                        .denied()
                        .actor(user.id)
                        .entity("user", user.id)
                        .details(json!({ "locked_until": until, "failed_attempts": failures }))
                        .meta(&meta),
                )
                .await;
        }

        return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let response = issue_tokens(&state, &user, role, &meta).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::LOGIN)
                .actor(user.id)
                .entity("user", user.id)
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/auth/refresh
///
/// Rotate a refresh token: the presented session is revoked and a new one
/// issued.
pub async fn refresh(
    State(state): State<AppState>,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid or expired refresh token".into()));

    let token_hash = hash_refresh_token(&input.refresh_token);
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(invalid)?;

    // A concurrent refresh may already have rotated this token.
    if !SessionRepo::revoke(&state.pool, session.id).await? {
        return Err(invalid());
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }

    let role = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    let response = issue_tokens(&state, &user, role, &meta).await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::TOKEN_REFRESH)
                .actor(user.id)
                .entity("user", user.id)
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/auth/logout
///
/// Revoke every session of the caller. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
    state
        .audit
        .record(
            AuditEvent::new(action_types::LOGOUT)
                .actor(user.user_id)
                .entity("user", user.user_id)
                .details(json!({ "sessions_revoked": revoked }))
                .meta(&meta),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let row = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        })?;
    let role = RoleRepo::resolve_name(&state.pool, row.role_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from_user(&row, role),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn record_denied_login(state: &AppState, user: &User, meta: &RequestMeta, reason: &str) {
    state
        .audit
        .record(
            AuditEvent::new(action_types::LOGIN_FAILED)
                .denied()
                .actor(user.id)
                .entity("user", user.id)
                .details(json!({ "reason": reason }))
                .meta(meta),
        )
        .await;
}

/// Sign an access token, persist a new session and build the response.
async fn issue_tokens(
    state: &AppState,
    user: &User,
    role: String,
    meta: &RequestMeta,
) -> AppResult<AuthResponse> {
    let jwt = &state.config.jwt;
    let access_token = generate_access_token(user.id, &role, jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: refresh_hash,
            expires_at: Utc::now() + jwt.refresh_token_ttl(),
            user_agent: meta.user_agent.clone(),
            ip_address: meta.ip_address.clone(),
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: jwt.access_token_ttl_secs(),
        user: UserResponse::from_user(user, role),
    })
}

