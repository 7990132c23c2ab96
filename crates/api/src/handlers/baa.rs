//! Handlers for `/admin/baa-templates`.
//!
//! Placeholder names are derived from the body on every write so
//! `required_variables` cannot drift from the text.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use empathy_core::audit::action_types;
use empathy_core::baa::{parse_variables, render, TemplateError, BODY_MAX};
use empathy_core::error::CoreError;
use empathy_core::types::DbId;
use empathy_db::models::baa_template::{BaaTemplate, CreateBaaTemplate, UpdateBaaTemplate};
use empathy_db::repositories::BaaTemplateRepo;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub body: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenderRequest {
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct RenderedTemplate {
    pub template_id: DbId,
    pub version: i32,
    pub rendered: String,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/baa-templates
pub async fn list_templates(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<BaaTemplate>>>> {
    let templates = BaaTemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/admin/baa-templates
pub async fn create_template(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<CreateTemplateRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<BaaTemplate>>)> {
    let name = non_blank_name(&input.name)?;
    let required_variables = checked_variables(&input.body)?;

    let template = BaaTemplateRepo::create(
        &state.pool,
        &CreateBaaTemplate {
            name,
            description: input.description,
            body: input.body,
            required_variables,
            created_by: admin.user_id,
        },
    )
    .await?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_CREATE)
                .actor(admin.user_id)
                .entity("baa_template", template.id)
                .details(json!({ "name": template.name, "variables": template.required_variables }))
                .meta(&meta),
        )
        .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/admin/baa-templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BaaTemplate>>> {
    let template = BaaTemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/admin/baa-templates/{id}
pub async fn update_template(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateTemplateRequest>,
) -> AppResult<Json<DataResponse<BaaTemplate>>> {
    let name = input.name.as_deref().map(non_blank_name).transpose()?;
    let required_variables = input.body.as_deref().map(checked_variables).transpose()?;

    let template = BaaTemplateRepo::update(
        &state.pool,
        id,
        &UpdateBaaTemplate {
            name,
            description: input.description,
            body: input.body,
            required_variables,
            is_active: input.is_active,
        },
    )
    .await?
    .ok_or_else(|| not_found(id))?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_UPDATE)
                .actor(admin.user_id)
                .entity("baa_template", id)
                .details(json!({ "version": template.version, "is_active": template.is_active }))
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/admin/baa-templates/{id}
pub async fn delete_template(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BaaTemplateRepo::delete(&state.pool, id).await? {
        return Err(not_found(id).into());
    }

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_DELETE)
                .actor(admin.user_id)
                .entity("baa_template", id)
                .meta(&meta),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/baa-templates/{id}/render
///
/// Only variable names reach the audit log, never their values.
pub async fn render_template(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<RenderRequest>,
) -> AppResult<Json<DataResponse<RenderedTemplate>>> {
    let template = BaaTemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if !template.is_active {
        return Err(CoreError::Conflict("Template is inactive".into()).into());
    }

    let rendered = render(&template.body, &input.variables).map_err(template_error)?;

    let mut names: Vec<&str> = input.variables.keys().map(String::as_str).collect();
    names.sort_unstable();
    state
        .audit
        .record(
            AuditEvent::new(action_types::BAA_RENDERED)
                .actor(admin.user_id)
                .entity("baa_template", id)
                .details(json!({ "version": template.version, "variables": names }))
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse {
        data: RenderedTemplate {
            template_id: template.id,
            version: template.version,
            rendered,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "BaaTemplate",
        id,
    }
}

fn non_blank_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("name: must not be blank".into()).into());
    }
    Ok(trimmed.to_string())
}

/// Size-check a body and extract its placeholder names.
fn checked_variables(body: &str) -> AppResult<Vec<String>> {
    if body.len() > BODY_MAX {
        return Err(
            CoreError::Validation(format!("body: must be at most {BODY_MAX} bytes")).into(),
        );
    }
    parse_variables(body).map_err(template_error)
}

pub fn template_error(err: TemplateError) -> AppError {
    match err {
        TemplateError::MissingVariables(_) => AppError::BadRequest(err.to_string()),
        other => CoreError::Validation(format!("body: {other}")).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn missing_variables_are_bad_requests() {
        let err = template_error(TemplateError::MissingVariables(vec![
            "client_name".into(),
            "effective_date".into(),
        ]));
        assert_matches!(err, AppError::BadRequest(msg) if msg.contains("client_name, effective_date"));
    }

    #[test]
    fn malformed_bodies_are_validation_errors() {
        assert_matches!(
            checked_variables("Hello {{ name"),
            Err(AppError::Core(CoreError::Validation(msg))) if msg.starts_with("body:")
        );
        assert_eq!(
            checked_variables("{{b}} and {{ a }} and {{b}}").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn oversized_bodies_are_rejected() {
        let body = "x".repeat(BODY_MAX + 1);
        assert_matches!(
            checked_variables(&body),
            Err(AppError::Core(CoreError::Validation(_)))
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(non_blank_name("   ").is_err());
        assert_eq!(non_blank_name(" Standard BAA ").unwrap(), "Standard BAA");
    }
}
