//! Audit log actions.
//!
//! Every security-relevant operation appends one immutable row to `audit_log`.
//! Entries are written best-effort; they never fail the triggering request.

/// Security-relevant actions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Signup,
    LoginSuccess,
    LoginFailed,
    ApiKeyCreated,
    ApiKeyUpdated,
    ApiKeyRevoked,
    ProfileUpdate,
    Logout,
}

impl AuditAction {
    /// Stable string stored in the `action` column.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Signup => "SIGNUP",
            AuditAction::LoginSuccess => "LOGIN_SUCCESS",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::ApiKeyCreated => "API_KEY_CREATED",
            AuditAction::ApiKeyUpdated => "API_KEY_UPDATED",
            AuditAction::ApiKeyRevoked => "API_KEY_REVOKED",
            AuditAction::ProfileUpdate => "PROFILE_UPDATE",
            AuditAction::Logout => "LOGOUT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_strings_are_stable() {
        assert_eq!(AuditAction::Signup.as_str(), "SIGNUP");
        assert_eq!(AuditAction::LoginFailed.as_str(), "LOGIN_FAILED");
        assert_eq!(AuditAction::ApiKeyRevoked.as_str(), "API_KEY_REVOKED");
    }
}
