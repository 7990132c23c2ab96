//! Therapy goal rules: categories, progress bounds and status transitions.

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_ABANDONED: &str = "abandoned";

pub const VALID_STATUSES: &[&str] = &[STATUS_ACTIVE, STATUS_COMPLETED, STATUS_ABANDONED];

pub const VALID_CATEGORIES: &[&str] = &[
    "emotional",
    "behavioral",
    "social",
    "physical",
    "cognitive",
    "other",
];

pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 2000;
pub const PROGRESS_MIN: i32 = 0;
pub const PROGRESS_MAX: i32 = 100;

pub fn validate_status(status: &str) -> Result<(), String> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(format!(
            "Invalid goal status '{status}'. Must be one of: {}",
            VALID_STATUSES.join(", ")
        ))
    }
}

pub fn validate_category(category: &str) -> Result<(), String> {
    if VALID_CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(format!(
            "Invalid goal category '{category}'. Must be one of: {}",
            VALID_CATEGORIES.join(", ")
        ))
    }
}

pub fn validate_progress(progress: i32) -> Result<(), String> {
    if (PROGRESS_MIN..=PROGRESS_MAX).contains(&progress) {
        Ok(())
    } else {
        Err(format!(
            "progress must be between {PROGRESS_MIN} and {PROGRESS_MAX}"
        ))
    }
}

/// Completed goals are final. Active goals may complete or be abandoned;
/// abandoned goals may be reactivated. Staying in place is always allowed.
pub fn validate_transition(from: &str, to: &str) -> Result<(), String> {
    validate_status(to)?;
    let allowed = from == to
        || matches!(
            (from, to),
            (STATUS_ACTIVE, STATUS_COMPLETED)
                | (STATUS_ACTIVE, STATUS_ABANDONED)
                | (STATUS_ABANDONED, STATUS_ACTIVE)
        );
    if allowed {
        Ok(())
    } else {
        Err(format!("Cannot change goal status from '{from}' to '{to}'"))
    }
}

/// Result of applying a status/progress update to a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalUpdate {
    pub status: String,
    pub progress: i32,
    /// True when this update moves the goal into `completed`.
    pub newly_completed: bool,
}

/// Resolve the goal's next status and progress.
///
/// Completing a goal pins progress to 100, and an active goal whose
/// progress reaches 100 completes.
pub fn plan_update(
    current_status: &str,
    current_progress: i32,
    new_status: Option<&str>,
    new_progress: Option<i32>,
) -> Result<GoalUpdate, String> {
    if let Some(p) = new_progress {
        validate_progress(p)?;
    }
    if current_status == STATUS_COMPLETED && new_progress.is_some_and(|p| p != PROGRESS_MAX) {
        return Err("Cannot change progress of a completed goal".to_string());
    }

    let mut status = new_status.unwrap_or(current_status);
    validate_transition(current_status, status)?;

    let mut progress = new_progress.unwrap_or(current_progress);
    if status == STATUS_COMPLETED {
        progress = PROGRESS_MAX;
    } else if status == STATUS_ACTIVE && progress == PROGRESS_MAX {
        status = STATUS_COMPLETED;
    }

    Ok(GoalUpdate {
        status: status.to_string(),
        progress,
        newly_completed: status == STATUS_COMPLETED && current_status != STATUS_COMPLETED,
    })
}
