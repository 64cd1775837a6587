//! Error types and handling.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// No resolvable actor for the request
    #[error("Unauthenticated: no actor for this request")]
    Unauthenticated,

    /// Record not found, or outside the caller's organization
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor may not perform this change
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Atomic write could not complete; nothing was applied
    #[error("Transaction failed: {0}")]
    Transaction(#[source] sea_orm::DbErr),

    /// Database read failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Status outcome reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    Forbidden,
    ValidationFailed,
    Failure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::ValidationFailed => "validation_failed",
            Self::Failure => "failure",
        };
        f.write_str(name)
    }
}

impl AppError {
    /// Create a not found error with message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a forbidden error with message
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a store error raised inside an open transaction.
    pub fn transaction(err: sea_orm::DbErr) -> Self {
        Self::Transaction(err)
    }

    /// Reclassify a store error raised after `begin()`.
    pub fn in_transaction(self) -> Self {
        match self {
            Self::Database(err) => Self::Transaction(err),
            other => other,
        }
    }

    /// Status outcome for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Validation(_) => ErrorKind::ValidationFailed,
            Self::Transaction(_) | Self::Database(_) => ErrorKind::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AppError::Unauthenticated.kind(), ErrorKind::Unauthorized);
        assert_eq!(AppError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(AppError::forbidden("x").kind(), ErrorKind::Forbidden);
        assert_eq!(AppError::validation("x").kind(), ErrorKind::ValidationFailed);
        assert_eq!(
            AppError::transaction(sea_orm::DbErr::Custom("boom".into())).kind(),
            ErrorKind::Failure
        );
    }
}
