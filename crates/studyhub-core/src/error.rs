//! Unified error types for StudyHub.
//!
//! Wraps whatever the hosted backend reports into actionable messages
//! the UI can show directly.

use std::io;

/// Result type alias for StudyHub operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Unified error type for StudyHub.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // ============================================================
    // User-facing errors (actionable)
    // ============================================================
    /// The action needs a signed-in user.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// E-mail/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The account already exists.
    #[error("An account with e-mail {email} already exists")]
    AlreadyRegistered { email: String },

    /// A row the caller expected is missing.
    #[error("{table} row not found: {id}")]
    NotFound { table: String, id: String },

    /// Input rejected before reaching the backend.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The caller may not perform the action.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The study group has no free seats.
    #[error("Group is full")]
    GroupFull,

    // ============================================================
    // Wrapped infrastructure errors
    // ============================================================
    /// The backend answered with an error.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport-level failure reaching the backend.
    #[error("Network error: {0}")]
    Network(String),

    /// Object storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Realtime channel failure.
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Shorthand for a missing row.
    pub fn not_found(table: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            table: table.into(),
            id: id.to_string(),
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Network(_) | CoreError::Realtime(_) => true,
            CoreError::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::not_found("files", "abc123");
        assert_eq!(err.to_string(), "files row not found: abc123");

        let err = CoreError::Backend {
            status: 409,
            message: "duplicate key".to_string(),
        };
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(CoreError::Network("reset".into()).is_transient());
        assert!(
            CoreError::Backend {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !CoreError::Backend {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!CoreError::NotAuthenticated.is_transient());
    }
}
