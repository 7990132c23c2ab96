//! Analytics event ingestion rules and summary windows.

use chrono::Duration;

use crate::types::Timestamp;
use crate::validation;

pub const EVENT_TYPE_MAX: usize = 64;
/// Serialized size limit for an event's `properties` object.
pub const PROPERTIES_MAX_BYTES: usize = 4096;
pub const DEFAULT_SUMMARY_DAYS: i64 = 30;

pub fn validate_event_type(event_type: &str) -> Result<(), String> {
    validation::validate_identifier(event_type, "event_type", EVENT_TYPE_MAX)
}

/// Properties must be a JSON object no larger than [`PROPERTIES_MAX_BYTES`]
/// when serialized.
pub fn validate_properties(properties: &serde_json::Value) -> Result<(), String> {
    if !properties.is_object() {
        return Err("properties must be a JSON object".to_string());
    }
    let size = serde_json::to_vec(properties)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX);
    if size > PROPERTIES_MAX_BYTES {
        return Err(format!(
            "properties must serialize to at most {PROPERTIES_MAX_BYTES} bytes"
        ));
    }
    Ok(())
}

/// Resolve the summary window. `to` defaults to `now`, `from` to
/// [`DEFAULT_SUMMARY_DAYS`] before `to`.
pub fn resolve_window(
    from: Option<Timestamp>,
    to: Option<Timestamp>,
    now: Timestamp,
) -> Result<(Timestamp, Timestamp), String> {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or(to - Duration::days(DEFAULT_SUMMARY_DAYS));
    if from > to {
        return Err("'from' must not be after 'to'".to_string());
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn event_types() {
        assert!(validate_event_type("session_started").is_ok());
        assert!(validate_event_type("Session").is_err());
        assert!(validate_event_type("with-dash").is_err());
    }

    #[test]
    fn properties_must_be_small_object() {
        assert!(validate_properties(&json!({"screen": "home"})).is_ok());
        assert!(validate_properties(&json!(["a"])).is_err());
        let big = json!({"blob": "x".repeat(PROPERTIES_MAX_BYTES)});
        assert!(validate_properties(&big).is_err());
    }

    #[test]
    fn window_defaults_to_thirty_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap();
        let (from, to) = resolve_window(None, None, now).unwrap();
        assert_eq!(to, now);
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let err = resolve_window(Some(now), Some(now - Duration::hours(1)), now);
        assert!(err.is_err());
    }
}
