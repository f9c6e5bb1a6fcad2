//! Storage error types for the credential and connector stores.

use std::error::Error as StdError;
use std::fmt;

/// Boxed error produced by a database backend.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested row was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// A row with the same primary key already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of entity that collided.
        entity: &'static str,
        /// The colliding ID.
        id: String,
    },

    /// Input rejected before reaching the database.
    #[error("Validation error: {message}")]
    Validation {
        /// Why the input was rejected.
        message: String,
    },

    /// A transport-encoded value could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// A stored document could not be deserialized.
    #[error("Failed to deserialize {entity} {id}: {source}")]
    Deserialization {
        /// Kind of entity whose row was malformed.
        entity: &'static str,
        /// ID of the malformed row.
        id: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be serialized for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A connector type tag has no registered constructor.
    #[error("Unknown connector type: {tag}")]
    UnknownType {
        /// The unregistered tag.
        tag: String,
    },

    /// Hashing or secret generation failed.
    #[error("Hashing error: {message}")]
    Hashing {
        /// Description of the failure.
        message: String,
    },

    /// Beginning, committing or rolling back a transaction failed.
    #[error("Transaction error: {message}")]
    Transaction {
        /// Description of the transaction error.
        message: String,
    },

    /// Opaque failure reported by the database backend.
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a new `Deserialization` error.
    #[must_use]
    pub fn deserialization(
        entity: &'static str,
        id: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::Deserialization {
            entity,
            id: id.into(),
            source,
        }
    }

    /// Creates a new `UnknownType` error.
    #[must_use]
    pub fn unknown_type(tag: impl Into<String>) -> Self {
        Self::UnknownType { tag: tag.into() }
    }

    /// Creates a new `Hashing` error.
    #[must_use]
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    /// Creates a new `Transaction` error.
    #[must_use]
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Wraps a backend error.
    #[must_use]
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns `true` if this is an unknown connector type error.
    #[must_use]
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType { .. })
    }

    /// Returns the wrapped backend error, if any.
    #[must_use]
    pub fn backend_source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::Validation { .. } | Self::UnknownType { .. } => ErrorCategory::Validation,
            Self::Decode { .. } | Self::Deserialization { .. } | Self::Serialization(_) => {
                ErrorCategory::Data
            }
            Self::Transaction { .. } => ErrorCategory::Transaction,
            Self::Backend(_) => ErrorCategory::Infrastructure,
            Self::Hashing { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Row not found.
    NotFound,
    /// Uniqueness conflict.
    Conflict,
    /// Rejected input.
    Validation,
    /// Malformed stored or presented data.
    Data,
    /// Transaction-related error.
    Transaction,
    /// Database/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Data => write!(f, "data"),
            Self::Transaction => write!(f, "transaction"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::not_found("client", "abc123");
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "client not found: abc123");
    }

    #[test]
    fn test_already_exists() {
        let err = StorageError::already_exists("client", "abc123");
        assert!(err.is_already_exists());
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn test_backend_source() {
        let io = std::io::Error::other("connection reset");
        let err = StorageError::backend(io);
        assert_eq!(err.category(), ErrorCategory::Infrastructure);
        let source = err.backend_source().expect("backend source");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        assert!(StorageError::validation("x").backend_source().is_none());
    }

    #[test]
    fn test_deserialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StorageError::deserialization("client", "c1", json_err);
        assert_eq!(err.category(), ErrorCategory::Data);
        assert!(err.to_string().starts_with("Failed to deserialize client c1"));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
