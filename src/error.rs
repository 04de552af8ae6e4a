//! Error types for reminder store access.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! accessible via [`RemindersError::code()`]. Codes are part of the tool
//! contract: MCP clients see them in the `error.code` field of failed tool
//! results.

use serde::Serialize;

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// The user declined the Reminders permission prompt.
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";

    /// The permission prompt was not answered before the deadline.
    pub const PERMISSION_TIMEOUT: &str = "PERMISSION_TIMEOUT";

    /// A list or reminder identifier did not resolve.
    pub const NOT_FOUND: &str = "NOT_FOUND";

    /// No account/source can host a new list.
    pub const NO_WRITABLE_SOURCE: &str = "NO_WRITABLE_SOURCE";

    /// Any other failure reported by the native store.
    pub const NATIVE_ERROR: &str = "NATIVE_ERROR";

    /// A fetch completion callback never fired.
    pub const TIMEOUT: &str = "TIMEOUT";

    /// A tool argument failed validation.
    pub const INVALID_INPUT: &str = "INVALID_INPUT";

    /// The store worker is not running.
    pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
}

/// Kind of entity a [`RemindersError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    List,
    Reminder,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List => f.write_str("List"),
            Self::Reminder => f.write_str("Reminder"),
        }
    }
}

/// Errors produced while talking to the reminder store.
///
/// The type is `Clone` so a single handshake outcome can be delivered to
/// every caller that waited on it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemindersError {
    /// User declined the permission prompt.
    #[error(
        "Reminders access denied. Please grant access in \
         System Settings > Privacy & Security > Reminders."
    )]
    AccessDenied,

    /// No response to the permission prompt within the deadline.
    #[error(
        "Permission request timed out after {seconds} seconds. \
         Please respond to the permission dialog and try again."
    )]
    PermissionTimeout { seconds: u64 },

    /// Identifier did not resolve by either lookup strategy.
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    /// No writable account exists to host a new list.
    #[error(
        "No writable source available for reminders. \
         Please configure a reminder account in System Settings > Internet Accounts."
    )]
    NoWritableSource,

    /// Any other native failure, with the native error details when known.
    #[error("{message}")]
    Native {
        message: String,
        domain: Option<String>,
        code: Option<i64>,
    },

    /// A fetch completion never fired.
    #[error("{0}")]
    Timeout(String),

    /// A caller-supplied argument failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store worker thread is gone.
    #[error("reminder store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RemindersError {
    /// Shorthand for a native failure without error-object details.
    pub fn native(message: impl Into<String>) -> Self {
        Self::Native {
            message: message.into(),
            domain: None,
            code: None,
        }
    }

    pub fn list_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::List,
            id: id.into(),
        }
    }

    pub fn reminder_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::Reminder,
            id: id.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied => error_codes::ACCESS_DENIED,
            Self::PermissionTimeout { .. } => error_codes::PERMISSION_TIMEOUT,
            Self::NotFound { .. } => error_codes::NOT_FOUND,
            Self::NoWritableSource => error_codes::NO_WRITABLE_SOURCE,
            Self::Native { .. } => error_codes::NATIVE_ERROR,
            Self::Timeout(_) => error_codes::TIMEOUT,
            Self::InvalidInput(_) => error_codes::INVALID_INPUT,
            Self::StoreUnavailable(_) => error_codes::STORE_UNAVAILABLE,
        }
    }

    /// Returns true if calling again may succeed without user intervention.
    ///
    /// A permission timeout re-runs the handshake on the next call; a fetch
    /// timeout or a stopped worker is transient. Everything else needs a
    /// different input or a change in system settings.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PermissionTimeout { .. } | Self::Timeout(_) | Self::StoreUnavailable(_) => true,
            Self::AccessDenied
            | Self::NotFound { .. }
            | Self::NoWritableSource
            | Self::Native { .. }
            | Self::InvalidInput(_) => false,
        }
    }

    /// JSON payload returned to MCP clients for a failed tool call.
    pub fn to_payload(&self) -> serde_json::Value {
        let mut error = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        });
        if let Self::Native {
            domain: Some(domain),
            code: Some(code),
            ..
        } = self
        {
            error["native_domain"] = serde_json::json!(domain);
            error["native_code"] = serde_json::json!(code);
        }
        serde_json::json!({ "error": error })
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, RemindersError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = RemindersError::reminder_not_found("abc-123");
        assert_eq!(err.to_string(), "Reminder not found: abc-123");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn permission_timeout_is_retryable() {
        let err = RemindersError::PermissionTimeout { seconds: 60 };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("60 seconds"));
    }

    #[test]
    fn access_denied_is_not_retryable() {
        assert!(!RemindersError::AccessDenied.is_retryable());
        assert!(!RemindersError::NoWritableSource.is_retryable());
    }

    #[test]
    fn native_without_details_uses_message() {
        let err = RemindersError::native("Failed to create list: Groceries");
        assert_eq!(err.to_string(), "Failed to create list: Groceries");
        assert_eq!(err.code(), "NATIVE_ERROR");
    }

    #[test]
    fn payload_includes_native_details() {
        let err = RemindersError::Native {
            message: "The operation couldn't be completed.".to_owned(),
            domain: Some("EKErrorDomain".to_owned()),
            code: Some(17),
        };
        let payload = err.to_payload();
        assert_eq!(payload["error"]["code"], "NATIVE_ERROR");
        assert_eq!(payload["error"]["native_domain"], "EKErrorDomain");
        assert_eq!(payload["error"]["native_code"], 17);
        assert_eq!(payload["error"]["retryable"], false);
    }

    #[test]
    fn all_codes_are_screaming_snake_case() {
        let errors = [
            RemindersError::AccessDenied,
            RemindersError::PermissionTimeout { seconds: 1 },
            RemindersError::list_not_found("x"),
            RemindersError::NoWritableSource,
            RemindersError::native("x"),
            RemindersError::Timeout("x".into()),
            RemindersError::InvalidInput("x".into()),
            RemindersError::StoreUnavailable("x".into()),
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code} is not SCREAMING_SNAKE_CASE"
            );
        }
    }
}
