//! Audit logging constants and utility functions.
//!
//! Every API route that changes state, touches clinical data, or calls an
//! external AI provider records an audit entry. This module owns the action
//! vocabulary, the retention category mapping, the integrity hash chain and
//! the redaction applied to entry details before storage.

use crate::hashing;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action type constants
// ---------------------------------------------------------------------------

/// Known action types for audit log entries.
pub mod action_types {
    pub const REGISTER: &str = "register";
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const ACCOUNT_LOCKED: &str = "account_locked";
    pub const LOGOUT: &str = "logout";
    pub const TOKEN_REFRESH: &str = "token_refresh";
    pub const PASSWORD_RESET: &str = "password_reset";

    pub const ENTITY_CREATE: &str = "entity_create";
    pub const ENTITY_UPDATE: &str = "entity_update";
    pub const ENTITY_DELETE: &str = "entity_delete";
    pub const MESSAGE_CREATE: &str = "message_create";

    pub const DELETION_REQUESTED: &str = "deletion_requested";
    pub const DELETION_CANCELLED: &str = "deletion_cancelled";
    pub const DELETION_COMPLETED: &str = "deletion_completed";
    pub const DELETION_REJECTED: &str = "deletion_rejected";

    pub const BAA_RENDERED: &str = "baa_rendered";
    pub const CONFIG_CHANGE: &str = "config_change";

    pub const AI_CHAT: &str = "ai_chat";
    pub const AI_EMOTION_ANALYSIS: &str = "ai_emotion_analysis";
    pub const AI_BIAS_ANALYSIS: &str = "ai_bias_analysis";

    pub const SYSTEM: &str = "system";
}

/// Outcome recorded with every audit entry.
pub mod outcomes {
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
    pub const DENIED: &str = "denied";
}

// ---------------------------------------------------------------------------
// Log category constants
// ---------------------------------------------------------------------------

/// Known log categories for retention policy grouping.
pub mod log_categories {
    pub const AUTHENTICATION: &str = "authentication";
    pub const PRIVACY: &str = "privacy";
    pub const CLINICAL: &str = "clinical";
    pub const CONFIGURATION: &str = "configuration";
    pub const AI: &str = "ai";
    pub const OPERATIONS: &str = "operations";
    pub const SYSTEM: &str = "system";
}

/// All log categories, in the order retention policies are seeded.
pub const ALL_CATEGORIES: &[&str] = &[
    log_categories::AUTHENTICATION,
    log_categories::PRIVACY,
    log_categories::CLINICAL,
    log_categories::CONFIGURATION,
    log_categories::AI,
    log_categories::OPERATIONS,
    log_categories::SYSTEM,
];

// ---------------------------------------------------------------------------
// Action-to-category mapping
// ---------------------------------------------------------------------------

/// Map an action type to its log category.
///
/// Unknown action types default to `"operations"`.
pub fn action_to_category(action_type: &str) -> &'static str {
    use action_types::*;

    match action_type {
        REGISTER | LOGIN | LOGIN_FAILED | ACCOUNT_LOCKED | LOGOUT | TOKEN_REFRESH
        | PASSWORD_RESET => log_categories::AUTHENTICATION,
        DELETION_REQUESTED | DELETION_CANCELLED | DELETION_COMPLETED | DELETION_REJECTED => {
            log_categories::PRIVACY
        }
        MESSAGE_CREATE => log_categories::CLINICAL,
        CONFIG_CHANGE | BAA_RENDERED => log_categories::CONFIGURATION,
        AI_CHAT | AI_EMOTION_ANALYSIS | AI_BIAS_ANALYSIS => log_categories::AI,
        SYSTEM => log_categories::SYSTEM,
        _ => log_categories::OPERATIONS,
    }
}

/// All action types that map to `category`. Used by the retention job to
/// purge one category at a time.
pub fn actions_in_category(category: &str) -> Vec<&'static str> {
    use action_types::*;

    const ALL: &[&str] = &[
        REGISTER,
        LOGIN,
        LOGIN_FAILED,
        ACCOUNT_LOCKED,
        LOGOUT,
        TOKEN_REFRESH,
        PASSWORD_RESET,
        ENTITY_CREATE,
        ENTITY_UPDATE,
        ENTITY_DELETE,
        MESSAGE_CREATE,
        DELETION_REQUESTED,
        DELETION_CANCELLED,
        DELETION_COMPLETED,
        DELETION_REJECTED,
        BAA_RENDERED,
        CONFIG_CHANGE,
        AI_CHAT,
        AI_EMOTION_ANALYSIS,
        AI_BIAS_ANALYSIS,
        SYSTEM,
    ];

    ALL.iter()
        .copied()
        .filter(|a| action_to_category(a) == category)
        .collect()
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "EMPATHY_AUDIT_CHAIN_SEED_V1";

/// The fields of an entry that are covered by the integrity hash.
#[derive(Debug, Clone, Copy)]
pub struct ChainFields<'a> {
    pub timestamp: Timestamp,
    pub user_id: Option<DbId>,
    pub action_type: &'a str,
    pub entity_type: Option<&'a str>,
    pub entity_id: Option<DbId>,
    pub outcome: &'a str,
}

/// Build the canonical string representation hashed into the chain.
///
/// Timestamps are rendered with microsecond precision because that is what
/// PostgreSQL `TIMESTAMPTZ` round-trips.
pub fn canonical_entry(fields: &ChainFields<'_>) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        fields
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        fields.user_id.map_or(String::new(), |id| id.to_string()),
        fields.action_type,
        fields.entity_type.unwrap_or(""),
        fields.entity_id.map_or(String::new(), |id| id.to_string()),
        fields.outcome,
    )
}

/// Compute the SHA-256 integrity hash for an audit log entry.
///
/// `prev_hash` is the integrity_hash of the previous entry, or `None` for the
/// first entry in the chain (which uses a known seed value).
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}

/// Result of walking a sequence of entries through the hash chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub verified_entries: i64,
    pub first_break: Option<DbId>,
}

/// One stored row as seen by [`verify_chain`].
#[derive(Debug, Clone)]
pub struct ChainRow<'a> {
    pub id: DbId,
    pub entry_data: String,
    pub prev_hash: Option<&'a str>,
    pub integrity_hash: Option<&'a str>,
}

/// Verify a chain of rows in ascending id order.
///
/// Every hashed row must reproduce its own `integrity_hash` from its stored
/// `prev_hash`. Consecutive hashed rows must also link, unless their ids are
/// not adjacent: retention prunes categories on different schedules, so the
/// rows in such a gap may have been removed legitimately. The oldest
/// retained row anchors on its own `prev_hash` (the seed when `None`).
/// Entries without a stored hash are counted but do not advance the chain.
pub fn verify_chain<'a, I>(rows: I) -> ChainVerification
where
    I: IntoIterator<Item = ChainRow<'a>>,
{
    let mut verified = 0;
    let mut previous: Option<(DbId, &'a str)> = None;

    for row in rows {
        if let Some(stored) = row.integrity_hash {
            let expected = compute_integrity_hash(row.prev_hash, &row.entry_data);
            let linked = match previous {
                Some((prev_id, prev_hash)) if row.id == prev_id + 1 => {
                    row.prev_hash == Some(prev_hash)
                }
                _ => true,
            };
            if stored != expected || !linked {
                return ChainVerification {
                    verified_entries: verified,
                    first_break: Some(row.id),
                };
            }
            previous = Some((row.id, stored));
        }
        verified += 1;
    }

    ChainVerification {
        verified_entries: verified,
        first_break: None,
    }
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Fields that should be redacted from audit log details before storage.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "private_key",
    "authorization",
    "credential",
    "ssn",
    "content",
    "transcript",
];

/// Redact sensitive fields from a JSON value, recursing into nested objects
/// and arrays.
///
/// Replaces the value of any key containing one of [`SENSITIVE_FIELDS`]
/// (case-insensitive) with `"[REDACTED]"`.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields(action: &str) -> ChainFields<'_> {
        ChainFields {
            timestamp: chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            user_id: Some(7),
            action_type: action,
            entity_type: Some("goal"),
            entity_id: Some(3),
            outcome: outcomes::SUCCESS,
        }
    }

    // -- category mapping ---------------------------------------------------

    #[test]
    fn auth_actions_map_to_authentication() {
        for action in [
            action_types::LOGIN,
            action_types::LOGIN_FAILED,
            action_types::ACCOUNT_LOCKED,
            action_types::LOGOUT,
        ] {
            assert_eq!(action_to_category(action), log_categories::AUTHENTICATION);
        }
    }

    #[test]
    fn deletion_actions_map_to_privacy() {
        assert_eq!(
            action_to_category(action_types::DELETION_COMPLETED),
            log_categories::PRIVACY
        );
    }

    #[test]
    fn ai_actions_map_to_ai() {
        assert_eq!(
            action_to_category(action_types::AI_BIAS_ANALYSIS),
            log_categories::AI
        );
    }

    #[test]
    fn unknown_action_maps_to_operations() {
        assert_eq!(action_to_category("something_else"), log_categories::OPERATIONS);
    }

    #[test]
    fn every_category_lookup_is_consistent() {
        for category in ALL_CATEGORIES {
            for action in actions_in_category(category) {
                assert_eq!(action_to_category(action), *category);
            }
        }
        assert!(actions_in_category(log_categories::OPERATIONS)
            .contains(&action_types::ENTITY_CREATE));
    }

    // -- hash chain -----------------------------------------------------------

    #[test]
    fn canonical_entry_is_pipe_delimited() {
        let data = canonical_entry(&fields(action_types::ENTITY_CREATE));
        assert_eq!(
            data,
            "2026-03-01T12:00:00.000000Z|7|entity_create|goal|3|success"
        );
    }

    #[test]
    fn first_entry_uses_seed() {
        let hash = compute_integrity_hash(None, "test_data");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, compute_integrity_hash(Some("other"), "test_data"));
    }

    #[test]
    fn same_input_produces_same_hash() {
        let a = compute_integrity_hash(None, "same_data");
        let b = compute_integrity_hash(None, "same_data");
        assert_eq!(a, b);
    }

    fn row<'a>(
        id: DbId,
        data: &str,
        prev: Option<&'a str>,
        hash: Option<&'a str>,
    ) -> ChainRow<'a> {
        ChainRow {
            id,
            entry_data: data.to_string(),
            prev_hash: prev,
            integrity_hash: hash,
        }
    }

    #[test]
    fn intact_chain_verifies() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let d2 = canonical_entry(&fields(action_types::LOGOUT));
        let h1 = compute_integrity_hash(None, &d1);
        let h2 = compute_integrity_hash(Some(h1.as_str()), &d2);

        let result = verify_chain(vec![
            row(1, &d1, None, Some(h1.as_str())),
            row(2, &d2, Some(h1.as_str()), Some(h2.as_str())),
        ]);
        assert_eq!(result.verified_entries, 2);
        assert_eq!(result.first_break, None);
    }

    #[test]
    fn tampered_entry_breaks_chain() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let d2 = canonical_entry(&fields(action_types::LOGOUT));
        let h1 = compute_integrity_hash(None, &d1);
        let h2 = compute_integrity_hash(Some(h1.as_str()), &d2);

        // Entry 2's content changed after hashing.
        let tampered = canonical_entry(&fields(action_types::ENTITY_DELETE));
        let result = verify_chain(vec![
            row(1, &d1, None, Some(h1.as_str())),
            row(2, &tampered, Some(h1.as_str()), Some(h2.as_str())),
        ]);
        assert_eq!(result.verified_entries, 1);
        assert_eq!(result.first_break, Some(2));
    }

    #[test]
    fn rehashed_entry_breaks_the_next_link() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let d2 = canonical_entry(&fields(action_types::LOGOUT));
        let h1 = compute_integrity_hash(None, &d1);
        let h2 = compute_integrity_hash(Some(h1.as_str()), &d2);

        // Entry 1 rewritten with a freshly computed hash; entry 2 still points at the old one.
        let forged = canonical_entry(&fields(action_types::ENTITY_DELETE));
        let forged_hash = compute_integrity_hash(None, &forged);
        let result = verify_chain(vec![
            row(1, &forged, None, Some(forged_hash.as_str())),
            row(2, &d2, Some(h1.as_str()), Some(h2.as_str())),
        ]);
        assert_eq!(result.first_break, Some(2));
    }

    #[test]
    fn unhashed_entries_are_counted_but_skipped() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let h1 = compute_integrity_hash(None, &d1);
        let result = verify_chain(vec![
            row(1, "legacy", None, None),
            row(2, &d1, None, Some(h1.as_str())),
        ]);
        assert_eq!(result.verified_entries, 2);
        assert!(result.first_break.is_none());
    }

    #[test]
    fn pruned_prefix_verifies_from_stored_prev_hash() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let d2 = canonical_entry(&fields(action_types::LOGOUT));
        let h1 = compute_integrity_hash(None, &d1);
        let h2 = compute_integrity_hash(Some(h1.as_str()), &d2);

        // Entry 1 was removed by retention; entry 2 recorded h1 as its prev_hash.
        let result = verify_chain(vec![row(2, &d2, Some(h1.as_str()), Some(h2.as_str()))]);
        assert_eq!(result.first_break, None);
        assert_eq!(result.verified_entries, 1);
    }

    #[test]
    fn gap_in_the_middle_is_not_a_break() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let d2 = canonical_entry(&fields(action_types::SYSTEM));
        let d3 = canonical_entry(&fields(action_types::LOGOUT));
        let h1 = compute_integrity_hash(None, &d1);
        let h2 = compute_integrity_hash(Some(h1.as_str()), &d2);
        let h3 = compute_integrity_hash(Some(h2.as_str()), &d3);

        let result = verify_chain(vec![
            row(1, &d1, None, Some(h1.as_str())),
            row(3, &d3, Some(h2.as_str()), Some(h3.as_str())),
        ]);
        assert_eq!(result.first_break, None);
        assert_eq!(result.verified_entries, 2);
    }

    #[test]
    fn adjacent_rows_must_link() {
        let d1 = canonical_entry(&fields(action_types::LOGIN));
        let d2 = canonical_entry(&fields(action_types::LOGOUT));
        let h1 = compute_integrity_hash(None, &d1);
        // Entry 2 self-consistent but hashed from the seed instead of h1.
        let h2 = compute_integrity_hash(None, &d2);

        let result = verify_chain(vec![
            row(1, &d1, None, Some(h1.as_str())),
            row(2, &d2, None, Some(h2.as_str())),
        ]);
        assert_eq!(result.first_break, Some(2));
        assert_eq!(result.verified_entries, 1);
    }

    // -- redaction ------------------------------------------------------------

    #[test]
    fn redacts_password_field() {
        let input = serde_json::json!({"username": "alice", "password": "s3cret"});
        let result = redact_sensitive_fields(&input);
        assert_eq!(result["username"], "alice");
        assert_eq!(result["password"], "[REDACTED]");
    }

    #[test]
    fn redacts_message_content_and_tokens() {
        let input = serde_json::json!({"content": "I feel awful", "refresh_token": "abc"});
        let result = redact_sensitive_fields(&input);
        assert_eq!(result["content"], "[REDACTED]");
        assert_eq!(result["refresh_token"], "[REDACTED]");
    }

    #[test]
    fn handles_nested_objects_and_arrays() {
        let input = serde_json::json!({"outer": [{"Secret_Key": "hidden", "name": "test"}]});
        let result = redact_sensitive_fields(&input);
        assert_eq!(result["outer"][0]["Secret_Key"], "[REDACTED]");
        assert_eq!(result["outer"][0]["name"], "test");
    }

    #[test]
    fn non_object_values_unchanged() {
        let input = serde_json::json!(42);
        assert_eq!(redact_sensitive_fields(&input), 42);
    }
}
