//! Handlers for `/ai` (emotion and bias analysis).
//!
//! Both endpoints ask the provider for a JSON object and validate the reply
//! before anything is returned or audited. An unusable reply is the
//! provider's fault and maps to 502.

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use empathy_core::audit::action_types;
use empathy_core::bias::{
    parse_layer_scores, pseudonymize_session_id, BiasConfig, BiasReport, LAYERS,
};
use empathy_core::conversation::{ChatMessage, ROLE_SYSTEM, ROLE_USER};
use empathy_core::emotion::{validate_scores, EmotionAnalysis};
use empathy_core::error::CoreError;
use empathy_core::llm::extract_json_object;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireClinician};
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::response::DataResponse;
use crate::state::AppState;

const EMOTION_PROMPT: &str = "You are an emotion classifier. Score the user's text for each of \
these emotions: joy, sadness, anger, fear, surprise, disgust, trust, anticipation, neutral. \
Reply with a single JSON object mapping each emotion to a number between 0 and 1, and nothing \
else.";

const BIAS_PROMPT: &str = "You audit therapy session transcripts for bias. Score the session on \
four layers, each a number between 0 and 1 where 0 means no bias: preprocessing, model_level, \
interactive, evaluation. Reply with a single JSON object with exactly those four keys, and \
nothing else.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct EmotionRequest {
    #[validate(length(min = 1, max = 8000, message = "must be between 1 and 8000 characters"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BiasRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 50000, message = "must be between 1 and 50000 characters"))]
    pub transcript: String,
    pub demographics: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct BiasAnalysisResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub report: BiasReport,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/ai/emotions/analyze
pub async fn analyze_emotions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<EmotionRequest>,
) -> AppResult<Json<DataResponse<EmotionAnalysis>>> {
    if input.text.trim().is_empty() {
        return Err(CoreError::Validation("text: must not be blank".into()).into());
    }

    let reply = state
        .ai
        .chat(&[
            ChatMessage::new(ROLE_SYSTEM, EMOTION_PROMPT),
            ChatMessage::new(ROLE_USER, input.text.as_str()),
        ])
        .await?;
    let analysis = interpret_emotions(&reply)?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::AI_EMOTION_ANALYSIS)
                .actor(user.user_id)
                .entity_type("emotion_analysis")
                .details(json!({
                    "dominant_emotion": analysis.dominant_emotion,
                    "text_length": input.text.chars().count(),
                }))
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: analysis }))
}

/// Rejects with 403 while `FEATURE_BIAS_DETECTION` is off, before the body
/// is read.
pub struct BiasDetectionEnabled;

impl FromRequestParts<AppState> for BiasDetectionEnabled {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.features.bias_detection {
            return Err(CoreError::Forbidden("Bias detection is disabled".into()).into());
        }
        Ok(BiasDetectionEnabled)
    }
}

/// POST /api/v1/ai/bias/analyze
///
/// Clinicians only, and only while `FEATURE_BIAS_DETECTION` is on.
pub async fn analyze_bias(
    State(state): State<AppState>,
    RequireClinician(user): RequireClinician,
    _enabled: BiasDetectionEnabled,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<BiasRequest>,
) -> AppResult<Json<DataResponse<BiasAnalysisResponse>>> {
    if let Some(demographics) = &input.demographics {
        if !demographics.is_object() {
            return Err(
                CoreError::Validation("demographics: must be a JSON object".into()).into(),
            );
        }
    }

    let mut user_message = format!("Transcript:\n{}", input.transcript);
    if let Some(demographics) = &input.demographics {
        user_message.push_str(&format!("\n\nParticipant demographics: {demographics}"));
    }
    let reply = state
        .ai
        .chat(&[
            ChatMessage::new(ROLE_SYSTEM, BIAS_PROMPT),
            ChatMessage::new(ROLE_USER, user_message),
        ])
        .await?;
    let report = interpret_bias(&reply)?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::AI_BIAS_ANALYSIS)
                .actor(user.user_id)
                .entity_type("bias_analysis")
                .details(json!({
                    "session_hash": pseudonymize_session_id(&input.session_id),
                    "overall_score": report.overall_score,
                    "alert_level": report.alert_level,
                    "layers_analyzed": LAYERS,
                }))
                .meta(&meta),
        )
        .await;

    if report.overall_score >= BiasConfig::default().high_threshold {
        tracing::warn!(
            alert_level = ?report.alert_level,
            overall_score = report.overall_score,
            "Elevated bias detected in session",
        );
    }

    Ok(Json(DataResponse {
        data: BiasAnalysisResponse {
            session_id: input.session_id,
            report,
        },
    }))
}

// ---------------------------------------------------------------------------
// Reply interpretation
// ---------------------------------------------------------------------------

pub fn interpret_emotions(reply: &str) -> AppResult<EmotionAnalysis> {
    let value = extract_json_object(reply).ok_or_else(|| {
        AppError::Upstream("emotion reply contained no JSON object".to_string())
    })?;
    validate_scores(&value).map_err(|e| AppError::Upstream(format!("emotion reply rejected: {e}")))
}

pub fn interpret_bias(reply: &str) -> AppResult<BiasReport> {
    let value = extract_json_object(reply)
        .ok_or_else(|| AppError::Upstream("bias reply contained no JSON object".to_string()))?;
    let scores =
        parse_layer_scores(&value).map_err(|e| AppError::Upstream(format!("bias reply rejected: {e}")))?;
    Ok(BiasConfig::default().analyze(scores))
}
