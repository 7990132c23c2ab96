//! Periodic audit log retention and session cleanup.
//!
//! Every hour each enabled retention policy prunes audit rows of its
//! category older than `active_retention_days`. Action types without a
//! category mapping fall under `operations`. Expired and revoked sessions
//! are removed in the same pass.

use std::time::Duration;

use chrono::Utc;
use empathy_core::audit::{actions_in_category, log_categories, ALL_CATEGORIES};
use empathy_db::repositories::{AuditLogRepo, AuditRetentionPolicyRepo, SessionRepo};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Rows removed by one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionOutcome {
    pub audit_rows_deleted: u64,
    pub sessions_deleted: u64,
}

/// Run the retention loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Audit retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Audit retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match run_once(&pool).await {
                    Ok(outcome) if outcome != RetentionOutcome::default() => {
                        tracing::info!(
                            audit_rows = outcome.audit_rows_deleted,
                            sessions = outcome.sessions_deleted,
                            "Retention: purged old rows",
                        );
                    }
                    Ok(_) => tracing::debug!("Retention: no rows to purge"),
                    Err(e) => tracing::error!(error = %e, "Retention: cleanup failed"),
                }
            }
        }
    }
}

/// Apply every enabled policy once.
pub async fn run_once(pool: &PgPool) -> Result<RetentionOutcome, sqlx::Error> {
    let now = Utc::now();
    let mut outcome = RetentionOutcome::default();

    for policy in AuditRetentionPolicyRepo::list_all(pool).await? {
        if !policy.enabled {
            continue;
        }
        let cutoff = now - chrono::Duration::days(i64::from(policy.active_retention_days));
        let actions = actions_in_category(&policy.log_category);
        let mut deleted = AuditLogRepo::delete_older_than(pool, &actions, cutoff).await?;

        if policy.log_category == log_categories::OPERATIONS {
            deleted += AuditLogRepo::delete_unlisted_older_than(pool, &known_actions(), cutoff).await?;
        }

        if deleted > 0 {
            tracing::debug!(category = %policy.log_category, deleted, "Retention: category pruned");
        }
        outcome.audit_rows_deleted += deleted;
    }

    outcome.sessions_deleted = SessionRepo::cleanup_expired(pool).await?;
    Ok(outcome)
}

/// Every action type that maps to a category.
fn known_actions() -> Vec<&'static str> {
    ALL_CATEGORIES
        .iter()
        .flat_map(|category| actions_in_category(category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use empathy_core::audit::action_types;

    #[test]
    fn known_actions_cover_every_category() {
        let actions = known_actions();
        assert!(actions.contains(&action_types::LOGIN));
        assert!(actions.contains(&action_types::DELETION_COMPLETED));
        assert!(actions.contains(&action_types::AI_CHAT));
        assert!(!actions.contains(&"made_up_action"));
    }
}
