//! Error types for the doctree system.

use thiserror::Error;

/// Result type alias using DoctreeError.
pub type Result<T> = std::result::Result<T, DoctreeError>;

/// Errors that can occur in the doctree system.
#[derive(Error, Debug)]
pub enum DoctreeError {
    /// Document not found.
    #[error("Document not found: {id}")]
    DocumentNotFound { id: i64 },

    /// Document block not found.
    #[error("Block not found: {id}")]
    BlockNotFound { id: i64 },

    /// A parent or owning document referenced by a write does not exist.
    #[error("Referential violation: {message}")]
    ReferentialViolation { message: String },

    /// Moving a document under itself or one of its descendants.
    #[error("Moving document {id} under {parent_id} would create a cycle")]
    CycleRejected { id: i64, parent_id: i64 },

    /// A write would nest documents deeper than the store allows.
    #[error("Document tree would exceed the maximum depth of {max}")]
    DepthExceeded { max: usize },

    /// The stored parent chain loops back on itself.
    #[error("Cycle detected in parent chain at document {id}")]
    CycleDetected { id: i64 },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Missing or wrong admin credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Storage error (unreachable store, rejected statement).
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (poisoned lock, broken invariant).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DoctreeError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a referential violation error.
    pub fn referential(message: impl Into<String>) -> Self {
        Self::ReferentialViolation {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            Self::BlockNotFound { .. } => "BLOCK_NOT_FOUND",
            Self::ReferentialViolation { .. } => "REFERENTIAL_VIOLATION",
            Self::CycleRejected { .. } => "CYCLE_REJECTED",
            Self::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code the request surface reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DocumentNotFound { .. } | Self::BlockNotFound { .. } => 404,
            Self::InvalidArgument { .. } | Self::Serialization(_) => 400,
            Self::Unauthorized => 401,
            Self::CycleRejected { .. } | Self::DepthExceeded { .. } => 409,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DoctreeError::DocumentNotFound { id: 42 };
        assert!(err.to_string().contains("42"));

        let err = DoctreeError::CycleRejected { id: 1, parent_id: 3 };
        assert_eq!(
            err.to_string(),
            "Moving document 1 under 3 would create a cycle"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            DoctreeError::DocumentNotFound { id: 1 }.error_code(),
            "DOCUMENT_NOT_FOUND"
        );
        assert_eq!(DoctreeError::storage("test").error_code(), "STORAGE_ERROR");
        assert_eq!(
            DoctreeError::referential("fk").error_code(),
            "REFERENTIAL_VIOLATION"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DoctreeError::BlockNotFound { id: 7 }.status_code(), 404);
        assert_eq!(DoctreeError::invalid_argument("bad id").status_code(), 400);
        assert_eq!(DoctreeError::Unauthorized.status_code(), 401);
        assert_eq!(
            DoctreeError::CycleRejected { id: 1, parent_id: 2 }.status_code(),
            409
        );
        assert_eq!(DoctreeError::DepthExceeded { max: 32 }.status_code(), 409);
        assert_eq!(DoctreeError::internal("poisoned").status_code(), 500);
        assert_eq!(DoctreeError::referential("fk").status_code(), 500);
        assert_eq!(DoctreeError::storage("down").status_code(), 500);
    }
}
