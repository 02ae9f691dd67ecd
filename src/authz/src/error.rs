//! Error types for role resolution and user acquisition

use thiserror::Error;

/// Stable error classification, independent of message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UserNotFound,
    BadValue,
    UnsupportedFormat,
    TypeMismatch,
    NoSuchKey,
    IllegalOperation,
    OperationFailed,
    AuthenticationRestrictionUnmet,
    StorageError,
    ConfigError,
    IoError,
}

impl ErrorCode {
    /// Expected, recoverable absence of an entity
    pub fn is_not_found_class(&self) -> bool {
        matches!(self, Self::UserNotFound)
    }

    /// Structural corruption of a stored document
    pub fn is_malformed_data_class(&self) -> bool {
        matches!(
            self,
            Self::BadValue | Self::UnsupportedFormat | Self::TypeMismatch | Self::NoSuchKey
        )
    }
}

/// Authorization state errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No stored document for the requested user
    #[error("Could not find user \"{user}\" for db \"{db}\"")]
    UserNotFound { user: String, db: String },

    /// Invalid value, either in caller input or in a stored document
    #[error("Bad value: {0}")]
    BadValue(String),

    /// A stored document field has the wrong shape
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A stored field has the wrong type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A required field is absent
    #[error("No such key: {0}")]
    NoSuchKey(String),

    /// The request is not allowed in this form
    #[error("Illegal operation: {0}")]
    IllegalOperation(String),

    /// Internal invariant violated
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// The connection does not satisfy any restriction document
    #[error("Authentication restrictions unmet: {0}")]
    AuthenticationRestrictionUnmet(String),

    /// Error raised by the underlying document store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Classification of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UserNotFound { .. } => ErrorCode::UserNotFound,
            Self::BadValue(_) => ErrorCode::BadValue,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::TypeMismatch(_) => ErrorCode::TypeMismatch,
            Self::NoSuchKey(_) => ErrorCode::NoSuchKey,
            Self::IllegalOperation(_) => ErrorCode::IllegalOperation,
            Self::OperationFailed(_) => ErrorCode::OperationFailed,
            Self::AuthenticationRestrictionUnmet(_) => ErrorCode::AuthenticationRestrictionUnmet,
            Self::Storage(_) => ErrorCode::StorageError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
        }
    }
}

/// Result type for authorization state operations
pub type Result<T> = std::result::Result<T, AuthzError>;
