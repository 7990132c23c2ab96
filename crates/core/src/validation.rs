//! Request validation helpers shared across resources.
//!
//! Shape checks (lengths, ranges, email syntax) are declared on request DTOs
//! with `validator` derives; [`describe_errors`] turns the collected
//! failures into the single message carried by `CoreError::Validation`.
//! Format rules that the derives cannot express live here as plain
//! functions.

use validator::ValidationErrors;

use crate::error::CoreError;

/// Minimum username length.
pub const USERNAME_MIN: usize = 3;
/// Maximum username length.
pub const USERNAME_MAX: usize = 50;

/// Render validation failures as `field: message` pairs, sorted by field
/// name so the output is deterministic.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", e.code));
                format!("{field}: {detail}")
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

/// Convert `validator` failures into a domain validation error.
pub fn into_core_error(errors: &ValidationErrors) -> CoreError {
    CoreError::Validation(describe_errors(errors))
}

/// Usernames are 3-50 characters of ASCII letters, digits, `_`, `.` or `-`.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        );
    }
    Ok(())
}

/// Machine identifiers (event types, variable names): a lowercase ASCII
/// letter followed by up to `max_len - 1` lowercase letters, digits or `_`.
pub fn validate_identifier(value: &str, field: &str, max_len: usize) -> Result<(), String> {
    let mut chars = value.chars();
    let starts_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !starts_ok || !rest_ok || value.len() > max_len {
        return Err(format!(
            "{field} must start with a lowercase letter, contain only [a-z0-9_] and be at most {max_len} characters"
        ));
    }
    Ok(())
}

/// Reject strings that are empty after trimming.
pub fn validate_not_blank(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "must be a valid email address"))]
        email: String,
        #[validate(length(min = 1, max = 5))]
        title: String,
    }

    #[test]
    fn describe_errors_is_sorted_and_uses_messages() {
        let sample = Sample {
            email: "not-an-email".into(),
            title: "far too long".into(),
        };
        let errors = sample.validate().unwrap_err();
        let msg = describe_errors(&errors);
        assert_eq!(
            msg,
            "email: must be a valid email address; title: failed 'length' check"
        );
    }

    #[test]
    fn valid_usernames_pass() {
        assert!(validate_username("jane.doe-1").is_ok());
        assert!(validate_username("abc").is_ok());
    }

    #[test]
    fn short_or_symbol_usernames_fail() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("jane doe").is_err());
        assert!(validate_username("jane@doe").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn identifiers() {
        assert!(validate_identifier("page_view", "event_type", 64).is_ok());
        assert!(validate_identifier("a1", "event_type", 64).is_ok());
        assert!(validate_identifier("1abc", "event_type", 64).is_err());
        assert!(validate_identifier("Page", "event_type", 64).is_err());
        assert!(validate_identifier("", "event_type", 64).is_err());
        assert!(validate_identifier(&"a".repeat(65), "event_type", 64).is_err());
    }

    #[test]
    fn blank_detection() {
        assert!(validate_not_blank("   ", "title").is_err());
        assert!(validate_not_blank(" x ", "title").is_ok());
    }
}
