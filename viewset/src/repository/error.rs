//! Repository error types
//!
//! # Example
//!
//! ```rust
//! use viewset::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Person");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert_eq!(error.to_string(), "Object not found");
//! ```

use std::fmt;

/// Repository operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Single-row lookup by filters
    FindOne,
    /// Windowed listing
    FindAll,
    /// Insert of a new row
    Insert,
    /// Partial update of an existing row
    Update,
    /// Removal of a row
    Delete,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindOne => write!(f, "find_one"),
            Self::FindAll => write!(f, "find_all"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of a repository failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// No row matched
    NotFound,
    /// A row with the same key already exists
    AlreadyExists,
    /// The data could not be stored as given
    ValidationFailed,
    /// Converting between entity and row failed
    SerializationError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::SerializationError => write!(f, "serialization_error"),
        }
    }
}

/// A failed repository operation
///
/// Displays as its message alone, since the message reaches clients through
/// the exception handler; operation and kind stay available for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation that failed
    pub operation: RepositoryOperation,
    /// What went wrong
    pub kind: RepositoryErrorKind,
    /// Client-facing message
    pub message: String,
    /// Entity type involved, if known
    pub entity_type: Option<String>,
}

impl RepositoryError {
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
        }
    }

    /// No row matched a single-row lookup
    pub fn not_found(entity_type: impl Into<String>) -> Self {
        Self {
            operation: RepositoryOperation::FindOne,
            kind: RepositoryErrorKind::NotFound,
            message: "Object not found".to_string(),
            entity_type: Some(entity_type.into()),
        }
    }

    /// An insert collided with an existing key
    pub fn already_exists(entity_type: impl Into<String>, key: impl fmt::Display) -> Self {
        Self {
            operation: RepositoryOperation::Insert,
            kind: RepositoryErrorKind::AlreadyExists,
            message: format!("Object with key {key} already exists"),
            entity_type: Some(entity_type.into()),
        }
    }

    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the failure is a missing row
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RepositoryError {}
