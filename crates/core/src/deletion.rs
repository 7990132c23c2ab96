//! Data deletion request lifecycle.
//!
//! A user may have at most one pending request. Only pending requests move,
//! and every move ends the request:
//!
//! ```text
//! pending -> completed  (admin approves, data erased)
//! pending -> rejected   (admin rejects, notes required)
//! pending -> cancelled  (user withdraws)
//! ```

use crate::types::DbId;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_REJECTED: &str = "rejected";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const VALID_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_COMPLETED,
    STATUS_REJECTED,
    STATUS_CANCELLED,
];

pub const DECISION_APPROVE: &str = "approve";
pub const DECISION_REJECT: &str = "reject";

/// Maximum length of the user-supplied reason and the admin's notes.
pub const TEXT_MAX: usize = 2000;

/// Password hash written to erased accounts. Not a PHC string, so it can
/// never verify.
pub const ERASED_PASSWORD_HASH: &str = "!erased";

pub fn validate_status(status: &str) -> Result<(), String> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(format!(
            "Invalid deletion request status '{status}'. Must be one of: {}",
            VALID_STATUSES.join(", ")
        ))
    }
}

pub fn is_terminal(status: &str) -> bool {
    status != STATUS_PENDING
}

pub fn validate_transition(from: &str, to: &str) -> Result<(), String> {
    let allowed = from == STATUS_PENDING
        && matches!(to, STATUS_COMPLETED | STATUS_REJECTED | STATUS_CANCELLED);
    if allowed {
        Ok(())
    } else {
        Err(format!("Cannot move deletion request from '{from}' to '{to}'"))
    }
}

/// Map an admin decision to the resulting status.
///
/// Rejections must carry non-blank notes explaining why.
pub fn decision_status(decision: &str, notes: Option<&str>) -> Result<&'static str, String> {
    match decision {
        DECISION_APPROVE => Ok(STATUS_COMPLETED),
        DECISION_REJECT => {
            if notes.map_or(true, |n| n.trim().is_empty()) {
                Err("notes are required when rejecting a deletion request".to_string())
            } else {
                Ok(STATUS_REJECTED)
            }
        }
        other => Err(format!(
            "Invalid decision '{other}'. Must be '{DECISION_APPROVE}' or '{DECISION_REJECT}'"
        )),
    }
}

/// Username written over an erased account.
pub fn anonymized_username(user_id: DbId) -> String {
    format!("deleted-user-{user_id}")
}

/// Email written over an erased account. `.invalid` is a reserved TLD.
pub fn anonymized_email(user_id: DbId) -> String {
    format!("deleted-{user_id}@deleted.invalid")
}
