//! Handlers for `/analytics` (event ingestion and summaries).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use empathy_core::analytics::{resolve_window, validate_event_type, validate_properties};
use empathy_core::audit::redact_sensitive_fields;
use empathy_core::error::CoreError;
use empathy_db::models::analytics::{AnalyticsEvent, AnalyticsSummary, CreateAnalyticsEvent};
use empathy_db::repositories::AnalyticsRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireClinician;
use crate::middleware::validated_json::ValidatedJson;
use crate::query::parse_timestamp_param;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct TrackEventRequest {
    pub event_type: String,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// POST /api/v1/analytics/events
///
/// Properties are redacted with the audit rules before storage.
pub async fn track_event(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<TrackEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AnalyticsEvent>>)> {
    validate_event_type(&input.event_type).map_err(CoreError::Validation)?;
    let properties = input
        .properties
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    validate_properties(&properties).map_err(CoreError::Validation)?;

    let event = AnalyticsRepo::create(
        &state.pool,
        &CreateAnalyticsEvent {
            user_id: user.user_id,
            event_type: input.event_type,
            properties: redact_sensitive_fields(&properties),
        },
    )
    .await?;

    tracing::debug!(user_id = user.user_id, event_type = %event.event_type, "Analytics event stored");
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/analytics/summary?from&to
pub async fn summary(
    State(state): State<AppState>,
    RequireClinician(_user): RequireClinician,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<DataResponse<AnalyticsSummary>>> {
    let from = parse_timestamp_param("from", params.from.as_deref())?;
    let to = parse_timestamp_param("to", params.to.as_deref())?;
    let (from, to) = resolve_window(from, to, Utc::now()).map_err(AppError::BadRequest)?;

    let summary = AnalyticsRepo::summary(&state.pool, from, to).await?;
    Ok(Json(DataResponse { data: summary }))
}
