//! Handlers for `/goals`.
//!
//! A goal is visible to its owner, to the clinician who created it and to
//! admins. Everyone else gets 404.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use empathy_core::audit::action_types;
use empathy_core::error::CoreError;
use empathy_core::goals::{
    plan_update, validate_category, validate_progress, validate_status, DESCRIPTION_MAX,
    STATUS_COMPLETED,
};
use empathy_core::types::DbId;
use empathy_db::models::goal::{CreateGoal, Goal, UpdateGoal};
use empathy_db::repositories::{GoalRepo, UserRepo};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::audit::AuditEvent;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::request_meta::RequestMeta;
use crate::middleware::validated_json::ValidatedJson;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListGoalsParams {
    pub status: Option<String>,
    pub user_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    /// Clinicians may set a patient's id here. Defaults to the caller.
    pub user_id: Option<DbId>,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    pub category: String,
    #[validate(range(min = 0, max = 100, message = "must be between 0 and 100"))]
    pub progress: Option<i32>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub progress: Option<i32>,
    pub target_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/goals?status&user_id
///
/// Without `user_id` the caller's own goals. Listing another user's goals
/// needs the clinician role; clinicians only see the goals they created.
pub async fn list_goals(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListGoalsParams>,
) -> AppResult<Json<DataResponse<Vec<Goal>>>> {
    if let Some(status) = params.status.as_deref() {
        validate_status(status).map_err(CoreError::Validation)?;
    }
    let target = params.user_id.unwrap_or(user.user_id);
    if target != user.user_id && !user.is_clinician() {
        return Err(CoreError::Forbidden("clinician role required".into()).into());
    }

    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let created_by = (target != user.user_id && !user.is_admin()).then_some(user.user_id);
    let goals = GoalRepo::list_for_user(
        &state.pool,
        target,
        params.status.as_deref(),
        created_by,
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse { data: goals }))
}

/// POST /api/v1/goals
pub async fn create_goal(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    ValidatedJson(input): ValidatedJson<CreateGoalRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Goal>>)> {
    validate_category(&input.category).map_err(CoreError::Validation)?;

    let owner = input.user_id.unwrap_or(user.user_id);
    if owner != user.user_id {
        if !user.is_clinician() {
            return Err(CoreError::Forbidden(
                "Only clinicians may create goals for another user".into(),
            )
            .into());
        }
        if UserRepo::find_by_id(&state.pool, owner).await?.is_none() {
            return Err(
                CoreError::Validation(format!("user_id: user {owner} does not exist")).into(),
            );
        }
    }

    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(CoreError::Validation("title: must not be blank".into()).into());
    }

    let mut goal = GoalRepo::create(
        &state.pool,
        &CreateGoal {
            user_id: owner,
            created_by: user.user_id,
            title,
            description: normalize_description(input.description),
            category: input.category,
            progress: input.progress.unwrap_or(0),
            target_date: input.target_date,
        },
    )
    .await?;

    // Full progress at creation completes the goal straight away.
    let plan = plan_update(&goal.status, goal.progress, None, None).map_err(CoreError::Validation)?;
    if plan.newly_completed {
        goal = GoalRepo::update(
            &state.pool,
            goal.id,
            &UpdateGoal {
                title: goal.title.clone(),
                description: goal.description.clone(),
                category: goal.category.clone(),
                status: plan.status,
                progress: plan.progress,
                target_date: goal.target_date,
                completed_at: Some(Utc::now()),
            },
        )
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Goal",
            id: goal.id,
        })?;
    }

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_CREATE)
                .actor(user.user_id)
                .entity("goal", goal.id)
                .details(json!({ "owner_id": goal.user_id, "category": goal.category }))
                .meta(&meta),
        )
        .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: goal })))
}

/// GET /api/v1/goals/{id}
pub async fn get_goal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Goal>>> {
    let goal = find_accessible(&state, &user, id).await?;
    Ok(Json(DataResponse { data: goal }))
}

/// PUT /api/v1/goals/{id}
///
/// Omitted fields keep their value. Status and progress go through
/// [`plan_update`] so lifecycle rules hold.
pub async fn update_goal(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateGoalRequest>,
) -> AppResult<Json<DataResponse<Goal>>> {
    if let Some(category) = input.category.as_deref() {
        validate_category(category).map_err(CoreError::Validation)?;
    }
    if let Some(status) = input.status.as_deref() {
        validate_status(status).map_err(CoreError::Validation)?;
    }
    if let Some(progress) = input.progress {
        validate_progress(progress).map_err(CoreError::Validation)?;
    }

    let current = find_accessible(&state, &user, id).await?;
    let plan = plan_update(
        &current.status,
        current.progress,
        input.status.as_deref(),
        input.progress,
    )
    .map_err(CoreError::Conflict)?;

    let title = match input.title {
        Some(t) if t.trim().is_empty() => {
            return Err(CoreError::Validation("title: must not be blank".into()).into())
        }
        Some(t) => t.trim().to_string(),
        None => current.title.clone(),
    };

    let completed_at = if plan.newly_completed {
        Some(Utc::now())
    } else if plan.status == STATUS_COMPLETED {
        current.completed_at
    } else {
        None
    };

    let previous_status = current.status.clone();
    let goal = GoalRepo::update(
        &state.pool,
        id,
        &UpdateGoal {
            title,
            description: match input.description {
                Some(d) => normalize_description(Some(d)),
                None => current.description,
            },
            category: input.category.unwrap_or(current.category),
            status: plan.status,
            progress: plan.progress,
            target_date: input.target_date.or(current.target_date),
            completed_at,
        },
    )
    .await?
    .ok_or(CoreError::NotFound { entity: "Goal", id })?;

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_UPDATE)
                .actor(user.user_id)
                .entity("goal", id)
                .details(json!({
                    "previous_status": previous_status,
                    "status": goal.status,
                    "progress": goal.progress,
                }))
                .meta(&meta),
        )
        .await;

    Ok(Json(DataResponse { data: goal }))
}

/// DELETE /api/v1/goals/{id}
pub async fn delete_goal(
    State(state): State<AppState>,
    user: AuthUser,
    meta: RequestMeta,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_accessible(&state, &user, id).await?;
    if !GoalRepo::delete(&state.pool, id).await? {
        return Err(CoreError::NotFound { entity: "Goal", id }.into());
    }

    state
        .audit
        .record(
            AuditEvent::new(action_types::ENTITY_DELETE)
                .actor(user.user_id)
                .entity("goal", id)
                .meta(&meta),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn can_access(goal: &Goal, user: &AuthUser) -> bool {
    goal.user_id == user.user_id || goal.created_by == Some(user.user_id) || user.is_admin()
}

async fn find_accessible(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Goal> {
    match GoalRepo::find_by_id(&state.pool, id).await? {
        Some(goal) if can_access(&goal, user) => Ok(goal),
        _ => Err(CoreError::NotFound { entity: "Goal", id }.into()),
    }
}

/// Blank descriptions are stored as NULL.
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .map(|d| d.chars().take(DESCRIPTION_MAX).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use empathy_core::roles::{ROLE_ADMIN, ROLE_PATIENT, ROLE_THERAPIST};

    fn goal(owner: DbId, creator: Option<DbId>) -> Goal {
        let now = Utc::now();
        Goal {
            id: 1,
            user_id: owner,
            created_by: creator,
            title: "Sleep by 11pm".into(),
            description: None,
            category: "physical".into(),
            status: "active".into(),
            progress: 0,
            target_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn caller(user_id: DbId, role: &str) -> AuthUser {
        AuthUser {
            user_id,
            role: role.into(),
        }
    }

    #[test]
    fn owner_creator_and_admin_can_access() {
        let g = goal(10, Some(20));
        assert!(can_access(&g, &caller(10, ROLE_PATIENT)));
        assert!(can_access(&g, &caller(20, ROLE_THERAPIST)));
        assert!(can_access(&g, &caller(99, ROLE_ADMIN)));
    }

    #[test]
    fn unrelated_users_cannot_access() {
        let g = goal(10, Some(20));
        assert!(!can_access(&g, &caller(11, ROLE_PATIENT)));
        assert!(!can_access(&g, &caller(21, ROLE_THERAPIST)));
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(normalize_description(Some("   ".into())), None);
        assert_eq!(
            normalize_description(Some(" walk daily ".into())),
            Some("walk daily".into())
        );
    }
}
