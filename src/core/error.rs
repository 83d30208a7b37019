use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// An unknown command token is deliberately *not* an error: resolution simply
/// falls through to alias and analyzer handling, so there is no variant for it.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Effective access level below the command's required level
    #[error("Access denied: required level {required}, effective level {effective}")]
    AccessDenied { required: i64, effective: i64 },

    /// Handler-reported domain error; the message is already user-facing
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A handler's own collaborator failed to answer
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Recursive re-dispatch went past the ceiling (alias cycle, analyzer loop)
    #[error("Dispatch depth {depth} exceeds the recursion ceiling")]
    DepthExceeded { depth: u8 },

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Unexpected internal errors (corrupted state, programming errors)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable label used for error metrics and log grouping.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::DatabasePool(_) => "database_pool",
            AppError::Telegram(_) => "telegram",
            AppError::AccessDenied { .. } => "access_denied",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Upstream(_) => "upstream",
            AppError::DepthExceeded { .. } => "depth_exceeded",
            AppError::Anyhow(_) => "internal",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            AppError::AccessDenied { required: 3, effective: 0 }.kind(),
            "access_denied"
        );
        assert_eq!(AppError::DepthExceeded { depth: 6 }.kind(), "depth_exceeded");
        assert_eq!(AppError::InvalidInput("bad date".into()).kind(), "invalid_input");
    }

    #[test]
    fn test_display_contains_context() {
        let err = AppError::DepthExceeded { depth: 6 };
        assert!(err.to_string().contains('6'));
    }
}
