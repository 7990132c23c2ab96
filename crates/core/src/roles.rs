//! Well-known role name constants and role checks.
//!
//! These must match the seed data in `20260301000001_create_roles_and_users.sql`.

use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_THERAPIST: &str = "therapist";
pub const ROLE_PATIENT: &str = "patient";

/// Seeded id of the `patient` role; self-registration always uses it.
pub const PATIENT_ROLE_ID: DbId = 3;

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_THERAPIST, ROLE_PATIENT];

/// Clinicians may read patient data they do not own (goals, analytics).
pub fn is_clinician(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_THERAPIST
}

pub fn is_admin(role: &str) -> bool {
    role == ROLE_ADMIN
}

/// Validate that a role name is one of the known roles.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_therapist_are_clinicians() {
        assert!(is_clinician(ROLE_ADMIN));
        assert!(is_clinician(ROLE_THERAPIST));
        assert!(!is_clinician(ROLE_PATIENT));
        assert!(!is_clinician("unknown"));
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(is_admin(ROLE_ADMIN));
        assert!(!is_admin(ROLE_THERAPIST));
    }

    #[test]
    fn unknown_role_rejected() {
        let err = validate_role("superuser").unwrap_err();
        assert!(err.contains("Invalid role"));
        assert!(validate_role(ROLE_PATIENT).is_ok());
    }
}
