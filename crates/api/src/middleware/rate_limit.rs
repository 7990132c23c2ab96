//! Fixed-window rate limiting middleware.
//!
//! Requests are keyed by the authenticated user when a valid bearer token
//! is present, otherwise by client IP. Over-budget requests get 429 with a
//! `Retry-After` header.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use empathy_core::error::CoreError;
use empathy_core::rate_limit::{FixedWindowLimiter, RateDecision};

use super::request_meta::client_ip;
use crate::auth::jwt::{bearer_token, validate_token, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// Limit `/auth/*` with the general limiter.
pub async fn limit_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state.rate_limiter, &state.config.jwt, req, next).await
}

/// Limit `/ai/*` with the AI limiter.
pub async fn limit_ai_requests(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    enforce(&state.ai_rate_limiter, &state.config.jwt, req, next).await
}

async fn enforce(
    limiter: &FixedWindowLimiter,
    jwt: &JwtConfig,
    req: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(req.headers(), jwt);
    match limiter.check(&key) {
        RateDecision::Allowed { .. } => next.run(req).await,
        decision @ RateDecision::Limited { .. } => {
            let retry_after_secs = decision.retry_after_secs();
            tracing::warn!(key = %key, path = %req.uri().path(), retry_after_secs, "Rate limit exceeded");
            AppError::Core(CoreError::RateLimited { retry_after_secs }).into_response()
        }
    }
}

/// `user:<id>` for a valid bearer token, else `ip:<addr>`, else `anonymous`.
pub fn rate_limit_key(headers: &HeaderMap, jwt: &JwtConfig) -> String {
    let user = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| validate_token(token, jwt).ok());

    match (user, client_ip(headers)) {
        (Some(claims), _) => format!("user:{}", claims.sub),
        (None, Some(ip)) => format!("ip:{ip}"),
        (None, None) => "anonymous".to_string(),
    }
}
